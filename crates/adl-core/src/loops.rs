//! Implicit loop analysis
//!
//! Inside an object block, a reference `muons.eta` to another (non
//! singleton) object means "for every muon". An `apply` containing such a
//! reference is evaluated once per element of that object, producing a
//! vector of results; a later `select`/`reject` on the result aggregates the
//! per-element outcomes (see [`LoopLogic`]).
//!
//! Only one loop object per statement is supported.

use serde::{Deserialize, Serialize};

use crate::ast::{BlockKind, Statement};
use crate::error::{CompileError, Result};
use crate::lexer::{terms, tokenize, Term};
use crate::symbols::SymbolRegistry;

/// Distinct objects iterated by dotted references in `operand`, first-seen
/// order. Names in `exclude` (the element source of the enclosing block)
/// are never loop objects.
pub fn loop_candidates(operand: &str, registry: &SymbolRegistry, exclude: &[&str]) -> Vec<String> {
    let tokens = tokenize(operand);
    let mut found: Vec<String> = Vec::new();
    for term in terms(&tokens) {
        let Term::Path {
            segments,
            called: false,
        } = term
        else {
            continue;
        };
        let [owner @ .., _attr] = segments.as_slice() else {
            continue;
        };
        if owner.is_empty() {
            continue;
        }
        let owner = owner.join(".");
        if registry.is_declared(BlockKind::Object, &owner)
            && !registry.is_singleton(&owner)
            && !exclude.contains(&owner.as_str())
            && !found.contains(&owner)
        {
            found.push(owner);
        }
    }
    found
}

/// The single loop object of a statement, if any.
pub fn implicit_loop(
    stmt: &Statement,
    registry: &SymbolRegistry,
    exclude: &[&str],
) -> Result<Option<String>> {
    let mut objects = loop_candidates(&stmt.operand, registry, exclude);
    match objects.len() {
        0 => Ok(None),
        1 => Ok(objects.pop()),
        _ => Err(CompileError::NestedImplicitLoop {
            line: stmt.line,
            objects,
            statement: stmt.text(),
        }),
    }
}

/// How the per-element outcomes of a loop result combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopLogic {
    /// `select`: every element must pass
    All,
    /// `reject`: one passing element discards the candidate
    Any,
}

impl LoopLogic {
    /// Argument of `cutvector::logical`
    pub fn cpp_token(&self) -> &'static str {
        match self {
            LoopLogic::All => "AND",
            LoopLogic::Any => "OR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Keyword;
    use crate::parser::parse_document;

    fn registry() -> SymbolRegistry {
        let doc = parse_document(
            "object muons\n take Muon\nobject electrons\n take Electron\n\
             object met\n take MissingET\nobject jets\n take Jet\n",
        )
        .unwrap();
        let mut reg = SymbolRegistry::from_document(&doc);
        reg.mark_singleton("met");
        reg
    }

    #[test]
    fn test_candidates_skip_singletons_and_source() {
        let reg = registry();
        let found = loop_candidates("dR(eta, muons.eta) + met.pt + jets.pt", &reg, &["jets"]);
        assert_eq!(found, vec!["muons"]);
    }

    #[test]
    fn test_repeated_object_counts_once() {
        let reg = registry();
        let stmt = Statement::new(Keyword::Apply, "dR(eta, phi, muons.eta, muons.phi) d", 3);
        assert_eq!(implicit_loop(&stmt, &reg, &[]).unwrap(), Some("muons".to_string()));
    }

    #[test]
    fn test_two_loop_objects_rejected() {
        let reg = registry();
        let stmt = Statement::new(Keyword::Apply, "f(muons.eta, electrons.eta) d", 9);
        let err = implicit_loop(&stmt, &reg, &[]).unwrap_err();
        match err {
            CompileError::NestedImplicitLoop {
                line,
                objects,
                statement,
            } => {
                assert_eq!(line, 9);
                assert_eq!(objects, vec!["muons", "electrons"]);
                assert_eq!(statement, "apply f(muons.eta, electrons.eta) d");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_aggregation_tokens() {
        use crate::emit::FilterKind;
        assert_eq!(FilterKind::Select.logic(), LoopLogic::All);
        assert_eq!(FilterKind::Reject.logic(), LoopLogic::Any);
        assert_eq!(LoopLogic::All.cpp_token(), "AND");
        assert_eq!(LoopLogic::Any.cpp_token(), "OR");
    }
}
