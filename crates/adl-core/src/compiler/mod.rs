//! Compilation pipeline: ADL text -> three C++ fragments.
//!
//! ## Pipeline
//!
//! ```text
//! ADL source
//!     ↓
//! parse_document()            blocks + statements, syntax errors
//!     ↓
//! SymbolRegistry              declared names per kind
//!     ↓
//! info       → banner         first info block, warning when absent
//! functions  → shims          header lookup + prototype decoding
//! objects    → object units   dependency order, singleton inference,
//!                             implicit loops
//! variables  → definitions    one apply per variable
//! cuts       → cut units      dependency order, cut-flow labels
//!     ↓
//! AnalyzerUnit (IR)
//!     ↓
//! render_files()              handlebars templates
//!     ↓
//! CompileOutput
//! ```
//!
//! The stage order is fixed: objects must run before variables and cuts
//! because they populate the singleton set, and every stage reads the
//! function cache filled by `functions`.

mod cuts;
mod functions;
mod info;
mod objects;
mod variables;

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::ast::BlockKind;
use crate::config::types::CompilerOptions;
use crate::context::CompilationContext;
use crate::diagnostics::Diagnostic;
use crate::emit::{render_files, AnalyzerUnit, GeneratedFiles};
use crate::error::{CompileError, Result};
use crate::headers::{HeaderResolver, ResolvedHeader};
use crate::parser::parse_document;
use crate::symbols::SymbolRegistry;

/// Everything one compilation produces
#[derive(Debug, Clone, Serialize)]
pub struct CompileOutput {
    pub files: GeneratedFiles,
    pub analyzer: AnalyzerUnit,
    /// Headers of the resolved function blocks, to be copied next to the
    /// generated sources
    pub headers: Vec<ResolvedHeader>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile an ADL document.
///
/// All-or-nothing: any fatal error aborts the compilation and no fragment
/// is returned. Non-fatal findings are collected in
/// [`CompileOutput::diagnostics`].
pub fn compile(
    source: &str,
    options: &CompilerOptions,
    resolver: &dyn HeaderResolver,
) -> Result<CompileOutput> {
    info!(analyzer = %options.analyzer_name, "compiling ADL document");

    let document = parse_document(source)?;
    info!(
        objects = document.count(BlockKind::Object),
        cuts = document.count(BlockKind::Cut),
        "extracted {} blocks",
        document.blocks.len()
    );

    let registry = SymbolRegistry::from_document(&document);
    let mut ctx = CompilationContext::new(options.clone(), registry, resolver);

    let banner = info::banner(&document, &mut ctx);

    let functions = functions::process(&document, &mut ctx)?;
    info!("resolved {} functions", functions.len());

    let (externals, objects) = objects::process(&document, &mut ctx)?;
    info!(
        "built {} objects from {} external inputs",
        objects.len(),
        externals.len()
    );

    let variables = variables::process(&document, &mut ctx)?;
    info!("defined {} variables", variables.len());

    let cuts = cuts::process(&document, &mut ctx)?;
    info!("built {} cuts", cuts.len());

    let analyzer = AnalyzerUnit {
        name: ctx.options.analyzer_name.clone(),
        banner,
        includes: ctx.headers.iter().map(|h| h.include.clone()).collect(),
        functions,
        variables,
        externals,
        objects,
        cuts,
    };

    let files = render_files(&analyzer, &ctx.options)?;
    info!(
        warnings = ctx.diagnostics.len(),
        "generated {}",
        analyzer.name
    );

    Ok(CompileOutput {
        files,
        analyzer,
        headers: ctx.headers,
        diagnostics: ctx.diagnostics,
    })
}

/// Read and compile an ADL file. The file name is used for the banner
/// unless `options.source_name` is already set.
pub fn compile_file(
    path: &Path,
    options: &CompilerOptions,
    resolver: &dyn HeaderResolver,
) -> Result<CompileOutput> {
    let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut options = options.clone();
    if options.source_name.is_empty() {
        options.source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
    }
    compile(&source, &options, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::InMemoryHeaders;

    #[test]
    fn test_compile_file_sets_source_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.adl");
        std::fs::write(&path, "info analysis\n  experiment CMS\nobject jets\n  take Jet\n").unwrap();

        let out =
            compile_file(&path, &CompilerOptions::default(), &InMemoryHeaders::new()).unwrap();
        assert_eq!(out.analyzer.banner.source_name, "minimal.adl");
        assert!(out.files.analyzer_source.contains("// LHADA file: minimal.adl"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = compile_file(
            Path::new("/nonexistent/analysis.adl"),
            &CompilerOptions::default(),
            &InMemoryHeaders::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }
}
