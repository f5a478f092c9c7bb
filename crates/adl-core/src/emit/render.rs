//! IR -> C++ text slots
//!
//! Each function renders one slot of the output templates. Layout follows
//! the hand-written TNM analyzers: two-space members, object loops at four
//! spaces, loop bodies at eight, and tab-separated declarations.

use std::fmt::{self, Write as _};

use serde::Serialize;

use super::ir::{
    AnalyzerUnit, CutUnit, FilterKind, FilterStep, FunctionShim, InfoBanner, ObjectBody,
    ObjectUnit,
};
use crate::config::types::CompilerOptions;

const TAB2: &str = "  ";
const TAB4: &str = "    ";
const TAB6: &str = "      ";
const TAB8: &str = "        ";

/// Variable holding the event adapter in the driver
pub const ADAPTER_VAR: &str = "adapter";
/// Variable holding the analyzer in the driver
pub const ANALYZER_VAR: &str = "analyzer";

/// Rendered text; writing into a `String` only fails if a `Display` impl does
pub type Text = Result<String, fmt::Error>;

/// Everything the templates interpolate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slots {
    pub name: String,
    pub info: String,
    pub created_line: String,
    pub includes: String,
    pub fundef: String,
    pub vardef: String,
    pub objdef: String,
    pub cutdef: String,
    pub vobjects: String,
    pub vcuts: String,
    pub runargs: String,
    pub runargsimpl: String,
    pub copyargsimpl: String,
    pub varimpl: String,
    pub extobjimpl: String,
    pub runimpl: String,
    pub treename: String,
    pub adaptername: String,
    pub adapter: String,
    pub analyzer: String,
}

pub fn slots(unit: &AnalyzerUnit, options: &CompilerOptions) -> Result<Slots, fmt::Error> {
    let run = run_arguments(unit)?;
    Ok(Slots {
        name: unit.name.clone(),
        info: banner(&unit.banner)?,
        created_line: created_line(options.created.as_deref()),
        includes: includes(&unit.includes),
        fundef: functions(&unit.functions)?,
        vardef: variable_declarations(unit)?,
        objdef: objects(unit)?,
        cutdef: cuts(&unit.cuts)?,
        vobjects: object_pointers(unit)?,
        vcuts: cut_pointers(unit)?,
        runargs: run.runargs,
        runargsimpl: run.runargsimpl,
        copyargsimpl: run.copyargsimpl,
        varimpl: variable_updates(unit)?,
        extobjimpl: run.extobjimpl,
        runimpl: run.runimpl,
        treename: options.tree_name().to_string(),
        adaptername: options.adapter.clone(),
        adapter: ADAPTER_VAR.to_string(),
        analyzer: ANALYZER_VAR.to_string(),
    })
}

// =============================================================================
// Header comments
// =============================================================================

pub fn banner(info: &InfoBanner) -> Text {
    let mut out = format!("//\n// LHADA file: {}\n", info.source_name);
    if info.block.is_some() {
        out.push_str("// info block\n");
        for entry in &info.entries {
            writeln!(out, "//\t{:<12}\t{}", entry.key, entry.value)?;
        }
    }
    out.push_str("//");
    Ok(out)
}

pub fn created_line(created: Option<&str>) -> String {
    match created {
        Some(stamp) => format!("// Created:     {} by adl2tnm {}", stamp, crate::VERSION),
        None => format!("// Generated by adl2tnm {}", crate::VERSION),
    }
}

pub fn includes(headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| format!("#include \"{}\"\n", h))
        .collect()
}

// =============================================================================
// Functions and variables
// =============================================================================

pub fn functions(shims: &[FunctionShim]) -> Text {
    if shims.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::from("//\n// functions\n");
    for shim in shims {
        out.push_str(&function_shim(shim)?);
    }
    Ok(out)
}

pub fn function_shim(shim: &FunctionShim) -> Text {
    let mut copies = String::new();
    for param in shim.params.iter().filter(|p| p.base_copy) {
        let copy = param.call_name();
        write!(
            copies,
            "\n  vector<TLorentzVector> {copy}({name}.size());\n  copy({name}.begin(), {name}.end(), {copy}.begin());",
            name = param.name,
        )?;
    }
    let args = shim
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let call_args = shim
        .params
        .iter()
        .map(|p| p.call_name())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "inline\n{rtype}\t{internal}({args})\n{{{copies}\n  return {external}({call_args});\n}};\n\n",
        rtype = shim.return_type,
        internal = shim.internal_name,
        external = shim.external_name,
    ))
}

fn variable_declarations(unit: &AnalyzerUnit) -> Text {
    if unit.variables.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::from("// variables\n");
    for var in &unit.variables {
        writeln!(out, "{}\t{};", var.value_type, var.name)?;
    }
    Ok(out)
}

fn variable_updates(unit: &AnalyzerUnit) -> Text {
    if unit.variables.is_empty() {
        return Ok(String::new());
    }
    let mut out = format!("{TAB2}// compute event level variables\n");
    for var in &unit.variables {
        writeln!(out, "{TAB2}{}\t= {};", var.name, var.value)?;
    }
    Ok(out)
}

// =============================================================================
// Objects
// =============================================================================

fn declaration(name: &str, singleton: bool) -> String {
    if singleton {
        format!("\nTEParticle {};\n\n", name)
    } else {
        format!("vector<TEParticle> {};\n", name)
    }
}

fn objects(unit: &AnalyzerUnit) -> Text {
    if unit.objects.is_empty() {
        return Ok(String::new());
    }
    let external: String = unit
        .externals
        .iter()
        .map(|ext| declaration(&ext.name, ext.singleton))
        .collect();
    let internal: String = unit
        .objects
        .iter()
        .map(|obj| declaration(&obj.name, obj.is_singleton()))
        .collect();

    let mut out = format!("// external objects\n{external}\n// internal objects\n{internal}\n");
    out.push_str("\n// object definitions\n");
    for object in &unit.objects {
        out.push_str(&object_struct(object)?);
    }
    Ok(out)
}

pub fn object_struct(object: &ObjectUnit) -> Text {
    let name = &object.name;
    let mut out = String::new();
    writeln!(out, "struct object_{name}_s : public lhadaThing")?;
    out.push_str("{\n");
    writeln!(out, "{TAB2}object_{name}_s() : lhadaThing() {{}}")?;
    writeln!(out, "{TAB2}~object_{name}_s() {{}}")?;
    writeln!(out, "{TAB2}void create()")?;
    writeln!(out, "{TAB2}{{")?;
    match &object.body {
        ObjectBody::Singleton { source } => {
            writeln!(out, "{TAB4}{name} = {source};")?;
        }
        ObjectBody::Collection { source, steps } => {
            out.push_str(&collection_body(name, source, steps)?);
        }
    }
    writeln!(out, "{TAB2}}};")?;
    writeln!(out, "}} object_{name};\n")?;
    Ok(out)
}

fn collection_body(name: &str, source: &str, steps: &[FilterStep]) -> Text {
    let mut out = String::new();
    writeln!(out, "{TAB4}{name}.clear();")?;
    writeln!(out, "{TAB4}for(size_t c=0; c < {source}.size(); c++)")?;
    writeln!(out, "{TAB4}  {{")?;
    writeln!(out, "{TAB8}TEParticle& p = {source}[c];")?;

    for step in steps {
        match step {
            FilterStep::Compute {
                result,
                value_type,
                call,
                implicit_loop: Some(object),
            } => {
                writeln!(out, "{TAB8}cutvector<{value_type}> {result}({object}.size());")?;
                writeln!(out, "{TAB8}for(size_t n=0; n < {object}.size(); n++)")?;
                writeln!(out, "{TAB8}  {{")?;
                writeln!(out, "{TAB8}{TAB4}TEParticle& q = {object}[n];")?;
                writeln!(out, "{TAB8}{TAB4}{result}[n] = {call};")?;
                writeln!(out, "{TAB8}  }}")?;
            }
            FilterStep::Compute {
                result,
                value_type,
                call,
                implicit_loop: None,
            } => {
                writeln!(out, "{TAB8}{value_type} {result} = {call};")?;
            }
            FilterStep::Filter {
                kind,
                condition,
                loop_results,
            } => {
                for result in loop_results {
                    writeln!(out, "{TAB8}{result}.logical({});", kind.logic().cpp_token())?;
                }
                match kind {
                    FilterKind::Select => {
                        writeln!(out, "{TAB8}if ( !({condition}) ) continue;")?;
                    }
                    FilterKind::Reject => {
                        writeln!(out, "{TAB8}if ( {condition} ) continue;")?;
                    }
                }
            }
        }
    }

    writeln!(out, "{TAB8}{name}.push_back(p);")?;
    writeln!(out, "{TAB4}  }}")?;
    Ok(out)
}

fn object_pointers(unit: &AnalyzerUnit) -> Text {
    let mut out = format!("{TAB2}// cache pointers to filtered objects\n{TAB2}objects.clear();\n");
    for object in &unit.objects {
        writeln!(out, "{TAB2}objects.push_back(&object_{});", object.name)?;
    }
    Ok(out)
}

// =============================================================================
// Cuts
// =============================================================================

fn cuts(units: &[CutUnit]) -> Text {
    if units.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::from("// selections\n");
    for cut in units {
        out.push_str(&cut_struct(cut)?);
    }
    Ok(out)
}

pub fn cut_struct(cut: &CutUnit) -> Text {
    let name = &cut.name;
    let mut out = String::new();
    writeln!(out, "struct cut_{name}_s : public lhadaThing")?;
    out.push_str(
        "{\n  std::string name;\n  double total;\n  double dtotal;\n  TH1F*  hcount;\n  bool   done;\n  bool   result;\n  double weight;\n\n  int    ncuts;\n\n",
    );
    writeln!(out, "  cut_{name}_s()")?;
    write!(
        out,
        "    : lhadaThing(),\n      name(\"{name}\"),\n      total(0),\n      dtotal(0),\n      hcount(0),\n      done(false),\n      result(false),\n      weight(1),\n      ncuts({})\n",
        cut.conditions.len()
    )?;
    write!(
        out,
        "  {{\n    hcount = new TH1F(\"cutflow_{name}\", \"\", 1, 0, 1);\n    hcount->SetCanExtend(1);\n    hcount->SetStats(0);\n    hcount->Sumw2();\n\n    hcount->Fill(\"none\", 0);\n"
    )?;
    for condition in &cut.conditions {
        writeln!(out, "{TAB4}hcount->Fill(\"{}\", 0);", condition.label)?;
    }
    out.push_str("  }\n\n");
    writeln!(out, "  ~cut_{name}_s() {{}}\n")?;
    out.push_str(CUT_SUMMARY);
    out.push_str("  void count(string c)\t\t{ hcount->Fill(c.c_str(), weight); }\n");
    out.push_str("  void write(TFile* fout)\t{ fout->cd(); hcount->Write(); }\n");
    out.push_str("  void reset()\t\t\t{ done = false; result = false; }\n");
    out.push_str("  bool operator()()\t\t{ return apply(); }\n\n");
    out.push_str("  bool apply()\n  {\n");
    out.push_str("    if ( done ) return result;\n    done   = true;\n    result = false;\n    count(\"none\");\n\n");
    for condition in &cut.conditions {
        match condition.kind {
            FilterKind::Select => {
                writeln!(out, "{TAB4}if ( !({}) ) return false;", condition.test)?;
            }
            FilterKind::Reject => {
                writeln!(out, "{TAB4}if ( {} ) return false;", condition.test)?;
            }
        }
        writeln!(out, "{TAB4}count(\"{}\");\n", condition.label)?;
    }
    writeln!(out, "{TAB4}total  += weight;")?;
    writeln!(out, "{TAB4}dtotal += weight * weight;\n")?;
    writeln!(out, "{TAB4}// NB: remember to update result cache")?;
    writeln!(out, "{TAB4}result  = true;")?;
    writeln!(out, "{TAB4}return true;")?;
    out.push_str("  }\n");
    writeln!(out, "}} cut_{name};\n")?;
    Ok(out)
}

const CUT_SUMMARY: &str = r#"  void summary(std::ostream& os)
  {
    os << name << std::endl;
    double gtotal = hcount->GetBinContent(1);
    for(int c=0; c <= ncuts; c++)
      {
        double value(hcount->GetBinContent(c+1));
        double error(hcount->GetBinError(c+1));
        double efficiency=0;
        if ( gtotal > 0 ) efficiency = value/gtotal;
        char record[1024];
        sprintf(record,
                " %2d %-45s:"
                " %9.2f +/- %5.1f %6.3f",
                c+1, hcount->GetXaxis()->GetBinLabel(c+1),
                value, error, efficiency);
        os << record << std::endl;
      }
    os << std::endl;
  }
"#;

fn cut_pointers(unit: &AnalyzerUnit) -> Text {
    let mut out = format!("{TAB2}// cache pointers to cuts\n{TAB2}cuts.clear();\n");
    for cut in &unit.cuts {
        writeln!(out, "{TAB2}cuts.push_back(&cut_{});", cut.name)?;
    }
    Ok(out)
}

/// Histogram label for a condition: collapsed whitespace, quotes escaped
pub fn cut_label(operand: &str) -> String {
    operand
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

// =============================================================================
// Event loop plumbing
// =============================================================================

struct RunArguments {
    runargs: String,
    runargsimpl: String,
    copyargsimpl: String,
    extobjimpl: String,
    runimpl: String,
}

fn run_arguments(unit: &AnalyzerUnit) -> Result<RunArguments, fmt::Error> {
    let impl_prefix = format!("void {}_s::run(", unit.name);
    let call_prefix = format!("{TAB6}{ANALYZER_VAR}.run(");
    let bigtab = " ".repeat(impl_prefix.len());
    let smalltab = " ".repeat("  void run(".len());
    let runtab = " ".repeat(call_prefix.len());

    let params: Vec<String> = unit
        .externals
        .iter()
        .map(|ext| format!("{}& {}_", ext.cpp_type(), ext.name))
        .collect();
    let names: Vec<&str> = unit.externals.iter().map(|ext| ext.name.as_str()).collect();

    let mut copyargsimpl = String::new();
    let mut extobjimpl = format!("\n{TAB6}// map external objects to internal ones\n");
    for ext in &unit.externals {
        writeln!(copyargsimpl, "{TAB2}{}\t= {}_;", ext.name, ext.name)?;
        writeln!(extobjimpl, "{TAB6}{} {};", ext.cpp_type(), ext.name)?;
        writeln!(
            extobjimpl,
            "{TAB6}{ADAPTER_VAR}(ev, \"{}\", \t{});",
            ext.name, ext.name
        )?;
    }

    let header_sep = format!(",\n{smalltab}");
    let impl_sep = format!(",\n{bigtab}");
    let call_sep = format!(",\n{runtab}");
    Ok(RunArguments {
        runargs: params.join(header_sep.as_str()),
        runargsimpl: format!("{impl_prefix}{})", params.join(impl_sep.as_str())),
        copyargsimpl,
        extobjimpl,
        runimpl: format!("{call_prefix}{});", names.join(call_sep.as_str())),
    })
}
