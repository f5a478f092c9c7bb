//! Symbol registry
//!
//! Block names are stored raw, keyed by `(kind, name)`. Mangling into C++
//! identifiers only happens when code is emitted ([`mangle`]).
//!
//! The registry also owns the singleton set: objects of which there is
//! exactly one per event (missing ET, event-level scalars). The set is
//! append-only for the lifetime of a compilation, so a name recorded as a
//! singleton is never later treated as a collection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{BlockKind, Document};

/// Name fragments that mark an object as a per-event singleton
static SINGLETON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"missing|met|event|scalar").unwrap());

/// Guess whether an object name denotes a singleton
pub fn looks_singleton(name: &str) -> bool {
    SINGLETON_PATTERN.is_match(&name.to_lowercase())
}

/// C++ identifier for a block name
///
/// Functions become `_<name>` (namespace dots turn into `_`), variables
/// `<name>_`; objects and cuts keep their name.
pub fn mangle(kind: BlockKind, name: &str) -> String {
    match kind {
        BlockKind::Function => format!("_{}", name.replace('.', "_")),
        BlockKind::Variable => format!("{}_", name),
        _ => name.to_string(),
    }
}

/// What a (possibly dotted) identifier refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier<'a> {
    /// Call of a declared function block (DSL name, dots kept)
    Function(String),
    /// Any other call (`abs`, `sqrt`, ...)
    Call,
    Variable,
    CutResult,
    /// Result of an implicit-loop `apply` in the current object block
    LoopResult,
    /// Bare object name (declared or external)
    Collection,
    /// `owner.attr`
    Member { owner: String, attr: &'a str },
    /// Bare attribute of the current element
    Attribute,
    Literal,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    names: BTreeMap<BlockKind, Vec<String>>,
    externals: Vec<String>,
    singletons: BTreeSet<String>,
}

impl SymbolRegistry {
    pub fn from_document(doc: &Document) -> Self {
        let mut registry = Self::default();
        for block in &doc.blocks {
            registry.declare(block.kind, &block.name);
        }
        registry
    }

    pub fn declare(&mut self, kind: BlockKind, name: &str) {
        let names = self.names.entry(kind).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    /// Declared names of one kind, in declaration order
    pub fn names(&self, kind: BlockKind) -> &[String] {
        self.names.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_declared(&self, kind: BlockKind, name: &str) -> bool {
        self.names(kind).iter().any(|n| n == name)
    }

    /// Record an event-level input that no object block declares.
    /// Returns `true` on first sight.
    pub fn mark_external(&mut self, name: &str) -> bool {
        if self.is_declared(BlockKind::Object, name) || self.is_external(name) {
            return false;
        }
        self.externals.push(name.to_string());
        true
    }

    pub fn is_external(&self, name: &str) -> bool {
        self.externals.iter().any(|n| n == name)
    }

    /// External inputs in first-seen order
    pub fn externals(&self) -> &[String] {
        &self.externals
    }

    /// Declared or external object
    pub fn is_object(&self, name: &str) -> bool {
        self.is_declared(BlockKind::Object, name) || self.is_external(name)
    }

    pub fn mark_singleton(&mut self, name: &str) -> bool {
        self.singletons.insert(name.to_string())
    }

    pub fn is_singleton(&self, name: &str) -> bool {
        self.singletons.contains(name)
    }

    pub fn is_collection(&self, name: &str) -> bool {
        self.is_object(name) && !self.is_singleton(name)
    }

    /// Classify one path term of an expression.
    pub fn classify<'a>(
        &self,
        segments: &[&'a str],
        called: bool,
        loop_results: &BTreeSet<String>,
    ) -> Identifier<'a> {
        if called {
            let name = segments.join(".");
            return if self.is_declared(BlockKind::Function, &name) {
                Identifier::Function(name)
            } else {
                Identifier::Call
            };
        }

        match segments {
            [] => Identifier::Literal,
            [word] => {
                if matches!(*word, "true" | "false") {
                    Identifier::Literal
                } else if loop_results.contains(*word) {
                    Identifier::LoopResult
                } else if self.is_declared(BlockKind::Variable, word) {
                    Identifier::Variable
                } else if self.is_declared(BlockKind::Cut, word) {
                    Identifier::CutResult
                } else if self.is_object(word) {
                    Identifier::Collection
                } else {
                    Identifier::Attribute
                }
            }
            [owner @ .., attr] => {
                let owner = owner.join(".");
                if loop_results.contains(&owner) {
                    Identifier::LoopResult
                } else {
                    Identifier::Member { owner, attr: *attr }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn registry() -> SymbolRegistry {
        let doc = parse_document(
            "function ns.dR\n code d.h\nobject jets\n take Jet\nvariable HT\n apply f(jets)\ncut pre\n select HT > 1\n",
        )
        .unwrap();
        SymbolRegistry::from_document(&doc)
    }

    #[test]
    fn test_singleton_guess() {
        assert!(looks_singleton("MET"));
        assert!(looks_singleton("missingET"));
        assert!(looks_singleton("EventScalars"));
        assert!(!looks_singleton("Jets"));
    }

    #[test]
    fn test_mangle() {
        assert_eq!(mangle(BlockKind::Function, "ns.dR"), "_ns_dR");
        assert_eq!(mangle(BlockKind::Variable, "HT"), "HT_");
        assert_eq!(mangle(BlockKind::Object, "jets"), "jets");
    }

    #[test]
    fn test_singleton_set_is_sticky() {
        let mut reg = registry();
        reg.mark_external("MissingET");
        assert!(reg.is_collection("MissingET"));
        reg.mark_singleton("MissingET");
        assert!(!reg.is_collection("MissingET"));
        assert!(!reg.mark_singleton("MissingET"));
        assert!(reg.is_singleton("MissingET"));
    }

    #[test]
    fn test_classify() {
        let reg = registry();
        let none = BTreeSet::new();
        assert_eq!(
            reg.classify(&["ns", "dR"], true, &none),
            Identifier::Function("ns.dR".into())
        );
        assert_eq!(reg.classify(&["abs"], true, &none), Identifier::Call);
        assert_eq!(reg.classify(&["HT"], false, &none), Identifier::Variable);
        assert_eq!(reg.classify(&["pre"], false, &none), Identifier::CutResult);
        assert_eq!(reg.classify(&["jets"], false, &none), Identifier::Collection);
        assert_eq!(reg.classify(&["PT"], false, &none), Identifier::Attribute);
        assert_eq!(
            reg.classify(&["jets", "pt"], false, &none),
            Identifier::Member { owner: "jets".into(), attr: "pt" }
        );

        let loops: BTreeSet<String> = ["dRjm".to_string()].into();
        assert_eq!(reg.classify(&["dRjm"], false, &loops), Identifier::LoopResult);
    }
}
