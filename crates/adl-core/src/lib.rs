//! adl-core: the ADL to TNM compiler pipeline
//!
//! This crate contains the translation logic with NO file-system side effects
//! beyond header lookup (which goes through the [`HeaderResolver`] trait):
//! - Tokenizer and block extractor (ADL text -> [`Document`])
//! - Symbol registry with singleton inference and emission-time mangling
//! - Dependency resolution (producer blocks before consumer blocks)
//! - C++ function signature decoding
//! - Implicit loop analysis and expression rewriting
//! - Structured emission (IR -> C++ fragments via handlebars templates)
//! - YAML configuration types and loader
//!
//! Project scaffolding and the command line live in the `adl2tnm` crate.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod context;
pub mod dag;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod headers;
pub mod lexer;
pub mod loops;
pub mod parser;
pub mod rewrite;
pub mod signature;
pub mod symbols;

// Re-export commonly used types
pub use ast::{Block, BlockKind, Document, Keyword, Statement};
pub use compiler::{compile, compile_file, CompileOutput};
pub use config::loader::ConfigLoader;
pub use config::types::CompilerOptions;
pub use context::{CompilationContext, FunctionInfo};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use emit::{AnalyzerUnit, Fragment, GeneratedFiles};
pub use error::CompileError;
pub use headers::{FsHeaderResolver, HeaderResolver, InMemoryHeaders, ResolvedHeader};
pub use parser::parse_document;
pub use signature::{decode_signature, FunctionSignature, SignatureError};
pub use symbols::SymbolRegistry;

/// Version stamped into generated files.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
