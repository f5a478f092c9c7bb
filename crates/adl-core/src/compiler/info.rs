//! Info stage: the comment banner of the generated files

use crate::ast::{BlockKind, Document, Statement};
use crate::context::CompilationContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::emit::{BannerEntry, InfoBanner};

pub(crate) fn banner(document: &Document, ctx: &mut CompilationContext<'_>) -> InfoBanner {
    let mut banner = InfoBanner {
        source_name: ctx.options.source_name.clone(),
        ..InfoBanner::default()
    };

    match document.blocks_of(BlockKind::Info).next() {
        Some(block) => {
            banner.block = Some(block.name.clone());
            banner.entries = block.body.iter().map(entry).collect();
        }
        None => ctx.warn(Diagnostic::warning(
            DiagnosticCode::MissingInfoBlock,
            "no info block found; the generated files carry no analysis description",
        )),
    }

    // tables are kept in the document but have no generated counterpart
    for table in document.blocks_of(BlockKind::Table) {
        ctx.warn(
            Diagnostic::info(
                DiagnosticCode::TableNotEmitted,
                format!("table {} is not used by the generated analyzer", table.name),
            )
            .at_line(table.line),
        );
    }

    banner
}

fn entry(stmt: &Statement) -> BannerEntry {
    match stmt.keyword {
        Some(keyword) => BannerEntry {
            key: keyword.as_str().to_string(),
            value: stmt.operand.clone(),
        },
        None => {
            let (key, value) = stmt
                .operand
                .split_once(char::is_whitespace)
                .unwrap_or((stmt.operand.as_str(), ""));
            BannerEntry {
                key: key.to_string(),
                value: value.trim().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CompilerOptions;
    use crate::headers::InMemoryHeaders;
    use crate::parser::parse_document;
    use crate::symbols::SymbolRegistry;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (InfoBanner, Vec<Diagnostic>) {
        let doc = parse_document(source).unwrap();
        let headers = InMemoryHeaders::new();
        let mut ctx = CompilationContext::new(
            CompilerOptions::default(),
            SymbolRegistry::from_document(&doc),
            &headers,
        );
        let banner = banner(&doc, &mut ctx);
        (banner, ctx.diagnostics)
    }

    #[test]
    fn test_keywords_and_free_rows() {
        let (banner, diags) =
            run("info analysis\n  comment  two  words\n  experiment CMS\n  SQRTS 13\n");
        assert!(diags.is_empty());
        assert_eq!(banner.block.as_deref(), Some("analysis"));
        let pairs: Vec<(&str, &str)> = banner
            .entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("comment", "two  words"), ("experiment", "CMS"), ("sqrtS", "13")]
        );
    }

    #[test]
    fn test_missing_info_warns() {
        let (banner, diags) = run("object jets\n  take Jet\n");
        assert_eq!(banner.block, None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::MissingInfoBlock);
    }

    #[test]
    fn test_tables_noted() {
        let (_, diags) = run("info analysis
  experiment CMS
table cutflow
  1 2
");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::TableNotEmitted);
        assert!(!diags[0].is_warning());
        assert_eq!(diags[0].line, Some(3));
    }
}
