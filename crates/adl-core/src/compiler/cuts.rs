//! Cut stage
//!
//! Every `select`/`reject` of a cut block becomes one cut-flow step with a
//! histogram label (the statement as written) and a rewritten test. Cuts
//! may refer to earlier cuts by name (`select preselection`), so blocks are
//! emitted in dependency order.

use tracing::{debug, info};

use crate::ast::{Block, BlockKind, Document, Statement};
use crate::context::CompilationContext;
use crate::dag::order_blocks;
use crate::diagnostics::ignored_statement;
use crate::emit::render::cut_label;
use crate::emit::{CutCondition, CutUnit, FilterKind};
use crate::error::{CompileError, Result};
use crate::lexer::{terms, tokenize, Term};
use crate::rewrite::{ExpressionRewriter, RewriteContext};
use crate::symbols::SymbolRegistry;

pub(crate) fn process(
    document: &Document,
    ctx: &mut CompilationContext<'_>,
) -> Result<Vec<CutUnit>> {
    let blocks: Vec<&Block> = document.blocks_of(BlockKind::Cut).collect();
    let ordered = order_blocks(BlockKind::Cut, &blocks)?;

    let mut units = Vec::with_capacity(ordered.len());
    for block in ordered {
        let mut conditions = Vec::new();
        for stmt in &block.body {
            let Some(kind) = stmt.keyword.and_then(FilterKind::from_keyword) else {
                ctx.warn(ignored_statement(&block.name, &stmt.text(), stmt.line));
                continue;
            };
            check_references(block, stmt, &ctx.registry)?;
            let test =
                ExpressionRewriter::new(&ctx.registry, RewriteContext::Cut).rewrite(&stmt.operand);
            debug!(cut = %block.name, %test, "condition");
            conditions.push(CutCondition {
                kind,
                label: cut_label(&stmt.operand),
                test,
            });
        }
        info!(cut = %block.name, "{} conditions", conditions.len());
        units.push(CutUnit {
            name: block.name.clone(),
            conditions,
        });
    }

    Ok(units)
}

/// A lone name must be a cut or variable; `owner.attr` needs a known object.
fn check_references(block: &Block, stmt: &Statement, registry: &SymbolRegistry) -> Result<()> {
    let tokens = tokenize(&stmt.operand);
    let terms = terms(&tokens);
    let significant: Vec<&Term<'_>> = terms
        .iter()
        .filter(|term| !matches!(term, Term::Token(tok) if tok.text.trim().is_empty()))
        .collect();

    if let [Term::Path {
        segments,
        called: false,
    }] = significant.as_slice()
    {
        if let [name] = segments.as_slice() {
            let known = registry.is_declared(BlockKind::Cut, name)
                || registry.is_declared(BlockKind::Variable, name)
                || matches!(*name, "true" | "false");
            if !known {
                return Err(CompileError::semantic(
                    stmt.line,
                    format!(
                        "cut {} refers to {}, which is neither a cut nor a variable",
                        block.name, name
                    ),
                ));
            }
            return Ok(());
        }
    }

    for term in &terms {
        let Some((segments, false)) = term.path() else {
            continue;
        };
        let [owner @ .., _attr] = segments else {
            continue;
        };
        if owner.is_empty() {
            continue;
        }
        let owner = owner.join(".");
        if !registry.is_object(&owner) {
            return Err(CompileError::semantic(
                stmt.line,
                format!("cut {} refers to undeclared object {}", block.name, owner),
            ));
        }
    }
    Ok(())
}
