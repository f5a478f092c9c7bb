//! End-to-end compilation of ADL documents.
//!
//! Headers are served from memory so the tests never depend on an
//! installation directory.

use adl_core::emit::{FilterStep, ObjectBody};
use adl_core::{
    compile, CompileError, CompilerOptions, DiagnosticCode, Fragment, InMemoryHeaders,
};
use pretty_assertions::assert_eq;

const DELTAR_H: &str = r#"
#ifndef DELTAR_H
#define DELTAR_H
#include <cmath>
inline
double deltaR(double eta1, double phi1,
              double eta2, double phi2)
{
  double deta = eta1 - eta2;
  return sqrt(deta*deta);
}
#endif
"#;

const KINEMATICS_H: &str = r#"
#include <vector>
#include "TLorentzVector.h"
double HT(std::vector<TLorentzVector>& jets);
"#;

const ANALYSIS: &str = r#"
# Sample ADL analysis
info analysis
  experiment CMS
  id         CMS-SUS-16-000
  sqrtS      13.0

function deltaR
  arg eta1
  arg phi1
  arg eta2
  arg phi2
  code deltaR.h

function HT
  arg jets
  code kinematics.h

object muons
  take Muon
  select PT > 10
  select abs(Eta) < 2.4

object jets
  take Jet
  select PT > 30 and
         abs(Eta) < 2.4
  apply deltaR(eta, phi, muons.eta, muons.phi) dRjm
  reject dRjm < 0.4

object met
  take MissingET

variable HTjets
  apply HT(jets)

cut preselection
  select jets.size >= 2
  select met.pt > 200

cut signal
  select preselection
  select HTjets > 500
"#;

fn headers() -> InMemoryHeaders {
    InMemoryHeaders::new()
        .with("deltaR.h", DELTAR_H)
        .with("kinematics.h", KINEMATICS_H)
}

fn options() -> CompilerOptions {
    CompilerOptions {
        analyzer_name: "susy".to_string(),
        source_name: "susy.adl".to_string(),
        ..CompilerOptions::default()
    }
}

#[test]
fn sample_analysis_compiles() {
    let out = compile(ANALYSIS, &options(), &headers()).unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let objects: Vec<&str> = out.analyzer.objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(objects, vec!["muons", "met", "jets"]);

    let externals: Vec<(&str, bool)> = out
        .analyzer
        .externals
        .iter()
        .map(|e| (e.name.as_str(), e.singleton))
        .collect();
    assert_eq!(externals, vec![("Muon", false), ("MissingET", true), ("Jet", false)]);

    assert_eq!(out.analyzer.includes, vec!["deltaR.h", "kinematics.h"]);
    assert_eq!(out.headers.len(), 2);

    let cuts: Vec<&str> = out.analyzer.cuts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cuts, vec!["preselection", "signal"]);
}

#[test]
fn implicit_loop_is_emitted() {
    let out = compile(ANALYSIS, &options(), &headers()).unwrap();
    let jets = out
        .analyzer
        .objects
        .iter()
        .find(|o| o.name == "jets")
        .unwrap();
    let ObjectBody::Collection { steps, .. } = &jets.body else {
        panic!("jets should be a collection");
    };
    assert!(matches!(
        &steps[1],
        FilterStep::Compute { implicit_loop: Some(object), .. } if object == "muons"
    ));

    let source = &out.files.analyzer_source;
    assert!(source.contains("cutvector<double> dRjm(muons.size());"));
    assert!(source.contains("TEParticle& q = muons[n];"));
    assert!(source.contains(r#"dRjm[n] = _deltaR(p("eta"), p("phi"), q("eta"), q("phi"));"#));
    assert!(source.contains("dRjm.logical(OR);"));
    assert!(source.contains(r#"if ( !(p("pt") > 30 && abs(p("eta")) < 2.4) ) continue;"#));
}

#[test]
fn fragments_reference_each_other() {
    let out = compile(ANALYSIS, &options(), &headers()).unwrap();
    let files = &out.files;

    assert!(files.analyzer_source.contains("#include \"susy_s.h\""));
    assert!(files.analyzer_source.contains("#include \"deltaR.h\""));
    assert!(files.analyzer_source.contains("double\tHTjets_;"));
    assert!(files.analyzer_source.contains("HTjets_\t= _HT(jets);"));
    assert!(files.analyzer_source.contains("cut_preselection()"));
    assert!(files.analyzer_header.contains("struct susy_s"));
    assert!(files.driver_source.contains("susy_s analyzer;"));
    assert!(files.driver_source.contains("// LHADA file: susy.adl"));
    assert_eq!(
        files.path(Fragment::AnalyzerSource),
        std::path::PathBuf::from("src/susy_s.cc")
    );
}

#[test]
fn compilation_is_deterministic() {
    let first = compile(ANALYSIS, &options(), &headers()).unwrap();
    let second = compile(ANALYSIS, &options(), &headers()).unwrap();
    assert_eq!(first.files, second.files);
}

#[test]
fn duplicate_block_produces_no_output() {
    let source = "object Jets\n  take Jet\nobject Jets\n  take Jet\n";
    let err = compile(source, &options(), &headers()).unwrap_err();
    assert!(matches!(err, CompileError::Syntax { line: 3, .. }));
    assert!(err.to_string().contains("duplicate block name Jets"));
}

#[test]
fn arg_count_mismatch_names_function() {
    let source = "function deltaR\n  arg eta1\n  arg phi1\n  code deltaR.h\n";
    let err = compile(source, &options(), &headers()).unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
    assert!(err.to_string().contains("function deltaR"), "{err}");
}

#[test]
fn circular_objects_are_rejected() {
    let source = "object a\n  take b\nobject b\n  take a\n";
    let err = compile(source, &options(), &headers()).unwrap_err();
    match err {
        CompileError::CircularDependency { blocks, .. } => assert_eq!(blocks, vec!["a", "b"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nested_implicit_loop_is_rejected() {
    let source = format!(
        "{}object electrons\n  take Electron\n\
         object fatjets\n  take FatJet\n  apply deltaR(muons.eta, muons.phi, electrons.eta, electrons.phi) d\n",
        ANALYSIS
    );
    let err = compile(&source, &options(), &headers()).unwrap_err();
    match err {
        CompileError::NestedImplicitLoop { objects, .. } => {
            assert_eq!(objects, vec!["muons", "electrons"])
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn select_on_loop_result_requires_every_element() {
    let source = format!(
        "{}object isolated\n  take Jet\n  apply deltaR(eta, phi, muons.eta, muons.phi) d\n  select d > 0.4\n",
        ANALYSIS
    );
    let out = compile(&source, &options(), &headers()).unwrap();
    let text = &out.files.analyzer_source;
    assert!(text.contains("cutvector<double> d(muons.size());"), "{text}");
    assert!(text.contains("        d.logical(AND);\n        if ( !(d > 0.4) ) continue;\n"));
    // the reject in jets keeps its own aggregation
    assert!(text.contains("dRjm.logical(OR);"));
}

#[test]
fn condition_over_other_collections_is_rejected() {
    let source = format!(
        "{}object electrons\n  take Electron\nobject pairs\n  take Jet\n  select muons.pt > electrons.pt\n",
        ANALYSIS
    );
    match compile(&source, &options(), &headers()).unwrap_err() {
        CompileError::NestedImplicitLoop { objects, statement, .. } => {
            assert_eq!(objects, vec!["muons", "electrons"]);
            assert_eq!(statement, "select muons.pt > electrons.pt");
        }
        other => panic!("unexpected error: {other}"),
    }

    let source = format!("{}object near\n  take Jet\n  select pt > muons.pt\n", ANALYSIS);
    let err = compile(&source, &options(), &headers()).unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
    assert!(err.to_string().contains("every element of muons"), "{err}");
}

#[test]
fn missing_info_block_warns() {
    let source = "object jets\n  take Jet\n  select pt > 20\n";
    let out = compile(source, &options(), &headers()).unwrap();
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, DiagnosticCode::MissingInfoBlock);
    assert!(!out.files.analyzer_source.contains("// info block"));
}

#[test]
fn ir_serializes_to_json() {
    let out = compile(ANALYSIS, &options(), &headers()).unwrap();
    let json = serde_json::to_value(&out.analyzer).unwrap();
    assert_eq!(json["name"], "susy");
    assert_eq!(json["objects"][1]["body"]["kind"], "singleton");
}
