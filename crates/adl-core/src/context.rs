//! Per-compilation state
//!
//! One [`CompilationContext`] is created for every `compile()` call and
//! threaded through the stages. Nothing outlives the call, so compiling two
//! documents in the same process never shares singleton or function state.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::types::CompilerOptions;
use crate::diagnostics::{Diagnostic, Severity};
use crate::headers::{HeaderResolver, ResolvedHeader};
use crate::signature::FunctionSignature;
use crate::symbols::SymbolRegistry;

/// Cached details of a resolved function block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    /// Name as written in the ADL file (`ns.f`)
    pub dsl_name: String,
    /// Shim name in the generated code (`_ns_f`)
    pub internal_name: String,
    /// Name of the wrapped C++ function (`ns::f`)
    pub external_name: String,
    pub signature: FunctionSignature,
    pub header: ResolvedHeader,
}

pub struct CompilationContext<'r> {
    pub options: CompilerOptions,
    pub registry: SymbolRegistry,
    /// Keyed by DSL name
    pub functions: BTreeMap<String, FunctionInfo>,
    /// Headers of resolved functions, in resolution order, without repeats
    pub headers: Vec<ResolvedHeader>,
    pub diagnostics: Vec<Diagnostic>,
    pub resolver: &'r dyn HeaderResolver,
}

impl<'r> CompilationContext<'r> {
    pub fn new(
        options: CompilerOptions,
        registry: SymbolRegistry,
        resolver: &'r dyn HeaderResolver,
    ) -> Self {
        Self {
            options,
            registry,
            functions: BTreeMap::new(),
            headers: Vec::new(),
            diagnostics: Vec::new(),
            resolver,
        }
    }

    /// Record a non-fatal finding
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Info => info!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn function(&self, dsl_name: &str) -> Option<&FunctionInfo> {
        self.functions.get(dsl_name)
    }

    pub fn add_header(&mut self, header: &ResolvedHeader) {
        if !self.headers.contains(header) {
            self.headers.push(header.clone());
        }
    }
}
