//! Variable stage: `variable HT  apply HT(jets)` -> `double HT_;`
//!
//! Variables are updated once per event in dependency order, so one that
//! reads another sees the current event's value.

use tracing::debug;

use crate::ast::{Block, BlockKind, Document, Keyword};
use crate::context::CompilationContext;
use crate::dag::order_blocks;
use crate::diagnostics::{ignored_statement, Diagnostic, DiagnosticCode};
use crate::emit::VariableDef;
use crate::error::{CompileError, Result};
use crate::rewrite::{ExpressionRewriter, RewriteContext};
use crate::symbols::mangle;

pub(crate) fn process(
    document: &Document,
    ctx: &mut CompilationContext<'_>,
) -> Result<Vec<VariableDef>> {
    let blocks: Vec<&Block> = document.blocks_of(BlockKind::Variable).collect();
    let ordered = order_blocks(BlockKind::Variable, &blocks)?;
    let mut definitions = Vec::with_capacity(ordered.len());

    for block in ordered {
        let mut applies = block.statements(Keyword::Apply);
        let apply = applies.next().ok_or_else(|| {
            CompileError::semantic(
                block.line,
                format!("variable {} must apply a function", block.name),
            )
        })?;

        let function = match apply.operand.split_once('(') {
            Some((name, _)) => name.trim(),
            None => {
                return Err(CompileError::semantic(
                    apply.line,
                    format!(
                        "variable {} must apply a function call, found '{}'",
                        block.name, apply.operand
                    ),
                ))
            }
        };
        let info = ctx
            .function(function)
            .filter(|_| ctx.registry.is_declared(BlockKind::Function, function))
            .ok_or_else(|| {
                CompileError::semantic(
                    apply.line,
                    format!(
                        "variable {} uses the function {}, but the latter may not have been defined",
                        block.name, function
                    ),
                )
            })?;

        let value = ExpressionRewriter::new(&ctx.registry, RewriteContext::Variable)
            .rewrite(&apply.operand);
        let definition = VariableDef {
            dsl_name: block.name.clone(),
            name: mangle(BlockKind::Variable, &block.name),
            value_type: info.signature.return_type.clone(),
            value,
        };
        debug!(variable = %definition.name, value = %definition.value, "defined");

        let extra: Vec<usize> = applies.map(|stmt| stmt.line).collect();
        for line in extra {
            ctx.warn(
                Diagnostic::warning(
                    DiagnosticCode::ExtraApply,
                    format!(
                        "variable {} applies more than one function; only the first is used",
                        block.name
                    ),
                )
                .at_line(line),
            );
        }
        for stmt in block.body.iter().filter(|s| !s.is(Keyword::Apply)) {
            ctx.warn(ignored_statement(&block.name, &stmt.text(), stmt.line));
        }

        definitions.push(definition);
    }

    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::functions;
    use crate::config::types::CompilerOptions;
    use crate::headers::InMemoryHeaders;
    use crate::parser::parse_document;
    use crate::symbols::SymbolRegistry;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (Result<Vec<VariableDef>>, Vec<Diagnostic>) {
        let doc = parse_document(source).unwrap();
        let headers = InMemoryHeaders::new().with(
            "ht.h",
            "double HT(std::vector<TLorentzVector>& jets);\ndouble sum(double a, double b);\n",
        );
        let mut ctx = CompilationContext::new(
            CompilerOptions::default(),
            SymbolRegistry::from_document(&doc),
            &headers,
        );
        functions::process(&doc, &mut ctx).unwrap();
        let defs = process(&doc, &mut ctx);
        (defs, ctx.diagnostics)
    }

    #[test]
    fn test_definition() {
        let (defs, diags) = run(
            "function HT\n  arg jets\n  code ht.h\nobject jets\n  take Jet\n\
             variable HTjets\n  apply HT(jets)\n  apply HT(jets)\n",
        );
        assert_eq!(
            defs.unwrap(),
            vec![VariableDef {
                dsl_name: "HTjets".into(),
                name: "HTjets_".into(),
                value_type: "double".into(),
                value: "_HT(jets)".into(),
            }]
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::ExtraApply);
    }

    const FUNCTIONS: &str =
        "function HT\n  arg jets\n  code ht.h\nfunction sum\n  arg a\n  arg b\n  code ht.h\n";

    #[test]
    fn test_dependency_order() {
        let source = format!(
            "{FUNCTIONS}variable total\n  apply sum(HTjets, HTjets)\nvariable HTjets\n  apply HT(jets)\n"
        );
        let (defs, _) = run(&source);
        let defs = defs.unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["HTjets_", "total_"]);
        assert_eq!(defs[1].value, "_sum(HTjets_, HTjets_)");
    }

    #[test]
    fn test_circular_variables() {
        let source =
            format!("{FUNCTIONS}variable a\n  apply sum(b, b)\nvariable b\n  apply sum(a, a)\n");
        let (defs, _) = run(&source);
        match defs.unwrap_err() {
            CompileError::CircularDependency { kind, blocks } => {
                assert_eq!(kind, BlockKind::Variable);
                assert_eq!(blocks, vec!["a", "b"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_undefined_function() {
        let (defs, _) = run("variable HTjets\n  apply sum(jets)\n");
        let err = defs.unwrap_err().to_string();
        assert!(
            err.contains("uses the function sum, but the latter may not have been defined"),
            "{err}"
        );
    }
}
