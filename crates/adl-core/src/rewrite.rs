//! Expression rewriting: ADL condition/call text -> C++ expression
//!
//! Rewriting is token based. Every path (`pt`, `jets.pt`, `ns.f(`) is
//! classified once through [`SymbolRegistry::classify`] and then rendered
//! according to the context the expression appears in:
//!
//! | context  | `pt`       | `src.pt`   | `loop.pt`   | `other.pt`    | `cut`     |
//! |----------|------------|------------|-------------|---------------|-----------|
//! | object   | `p("pt")`  | `p("pt")`  | -           | `other("pt")` | as is     |
//! | apply    | `p("pt")`  | `p("pt")`  | `q("pt")`   | `other("pt")` | as is     |
//! | cut      | as is      | -          | -           | `other("pt")` | `cut_c()` |
//!
//! `src` is the object taken by the enclosing block, `loop` the implicit
//! loop object of an `apply`. In every context declared functions and
//! variables get their mangled names and `and`/`or` become `&&`/`||`.
//! A lone `=` becomes `==`; `=<` and `=>` are written `<=` and `>=`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::BlockKind;
use crate::lexer::{terms, tokenize, Term, TokenKind};
use crate::symbols::{mangle, Identifier, SymbolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteContext {
    /// `select`/`reject` conditions of an object block
    Object,
    /// Arguments of an `apply` call in an object block
    Apply,
    /// Conditions of a cut block
    Cut,
    /// Arguments of a variable block `apply`
    Variable,
}

pub struct ExpressionRewriter<'r> {
    registry: &'r SymbolRegistry,
    context: RewriteContext,
    source: Option<&'r str>,
    loop_object: Option<&'r str>,
    loop_results: BTreeSet<String>,
}

impl<'r> ExpressionRewriter<'r> {
    pub fn new(registry: &'r SymbolRegistry, context: RewriteContext) -> Self {
        Self {
            registry,
            context,
            source: None,
            loop_object: None,
            loop_results: BTreeSet::new(),
        }
    }

    /// Object whose elements are bound to `p`
    pub fn with_source(mut self, source: &'r str) -> Self {
        self.source = Some(source);
        self
    }

    /// Implicit loop object whose elements are bound to `q`
    pub fn with_loop_object(mut self, object: Option<&'r str>) -> Self {
        self.loop_object = object;
        self
    }

    /// Names holding per-element loop results; left untouched
    pub fn with_loop_results<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loop_results.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn rewrite(&self, text: &str) -> String {
        let tokens = tokenize(text);
        let mut out = String::with_capacity(text.len() + 16);

        for term in terms(&tokens) {
            match term {
                Term::Token(tok) if tok.is(TokenKind::Operator) => out.push_str(operator(tok.text)),
                Term::Token(tok) => out.push_str(tok.text),
                Term::Member(attr) => {
                    if self.context == RewriteContext::Cut && attr == "size" {
                        out.push_str(".size()");
                    } else {
                        out.push_str(&accessor("", attr));
                    }
                }
                Term::Path { segments, called } => {
                    out.push_str(&self.path(&segments, called));
                }
            }
        }

        debug!(context = ?self.context, from = text, to = %out, "rewrite");
        out
    }

    fn path(&self, segments: &[&str], called: bool) -> String {
        if let [word] = segments {
            if !called {
                if word.eq_ignore_ascii_case("and") {
                    return "&&".to_string();
                }
                if word.eq_ignore_ascii_case("or") {
                    return "||\n\t".to_string();
                }
            }
        }

        let raw = || segments.join(".");
        match self.registry.classify(segments, called, &self.loop_results) {
            Identifier::Function(name) => mangle(BlockKind::Function, &name),
            Identifier::Variable => mangle(BlockKind::Variable, &raw()),
            Identifier::CutResult if self.context == RewriteContext::Cut => {
                format!("cut_{}()", raw())
            }
            Identifier::Attribute => match self.context {
                RewriteContext::Object | RewriteContext::Apply => accessor("p", &raw()),
                RewriteContext::Cut | RewriteContext::Variable => raw(),
            },
            Identifier::Member { owner, attr } => self.member(&owner, attr),
            Identifier::Call
            | Identifier::CutResult
            | Identifier::LoopResult
            | Identifier::Collection
            | Identifier::Literal => raw(),
        }
    }

    fn member(&self, owner: &str, attr: &str) -> String {
        let is_source = self.source == Some(owner);
        match self.context {
            RewriteContext::Object if is_source => accessor("p", attr),
            RewriteContext::Apply if self.loop_object == Some(owner) => accessor("q", attr),
            RewriteContext::Apply if is_source => accessor("p", attr),
            RewriteContext::Cut if attr == "size" => format!("{}.size()", owner),
            RewriteContext::Variable => format!("{}.{}", owner, attr),
            _ => accessor(owner, attr),
        }
    }
}

fn operator(text: &str) -> &str {
    match text {
        "=" => "==",
        "=<" => "<=",
        "=>" => ">=",
        other => other,
    }
}

/// `owner("attr")` with the attribute lower-cased
fn accessor(owner: &str, attr: &str) -> String {
    format!("{}(\"{}\")", owner, attr.to_lowercase())
}
