//! Block extractor: ADL source text -> [`Document`]
//!
//! ## Rules
//!
//! - `#` starts a comment; blank lines are ignored
//! - a line whose first word is a block type opens a block and must read
//!   exactly `<blocktype> <name>`
//! - a statement runs until the next line that starts with a reserved word
//!   (block type or keyword); continuation lines are joined with one space
//! - block names must stay unique after mangling

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{is_reserved, Block, BlockKind, Document, Keyword, Statement};
use crate::error::{CompileError, Result};
use crate::lexer::{source_lines, SourceLine};
use crate::symbols::mangle;

// ============================================================================
// Public API
// ============================================================================

/// Parse ADL source into blocks and statements, in document order.
pub fn parse_document(source: &str) -> Result<Document> {
    let lines = source_lines(source);
    let mut blocks: Vec<Block> = Vec::new();
    // mangled name -> line of first declaration
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut pending_line = 0;

    for (index, current) in lines.iter().enumerate() {
        let first = first_word(current);

        if let Some(kind) = BlockKind::parse(first) {
            blocks.push(block_header(kind, current, &mut seen)?);
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            return Err(CompileError::syntax(
                current.line,
                "statement outside of any block",
                current.text,
            ));
        };

        if pending.is_empty() {
            pending_line = current.line;
        }
        pending.push(current.text);

        let ends_here = lines
            .get(index + 1)
            .map_or(true, |next| is_reserved(first_word(next)));
        if ends_here {
            let text = pending.join(" ");
            pending.clear();
            block.body.push(statement(block.kind, &text, pending_line)?);
        }
    }

    debug!(blocks = blocks.len(), "extracted ADL blocks");
    Ok(Document { blocks })
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn first_word<'a>(line: &SourceLine<'a>) -> &'a str {
    line.text.split_whitespace().next().unwrap_or_default()
}

fn block_header(
    kind: BlockKind,
    line: &SourceLine<'_>,
    seen: &mut HashMap<String, usize>,
) -> Result<Block> {
    let fields: Vec<&str> = line.text.split_whitespace().collect();
    let [_, name] = fields.as_slice() else {
        return Err(CompileError::syntax(
            line.line,
            format!("expected '{} <name>'", kind),
            line.text,
        ));
    };

    let mangled = mangle(kind, name);
    if let Some(first) = seen.get(&mangled) {
        return Err(CompileError::syntax(
            line.line,
            format!("duplicate block name {} (first declared at line {})", mangled, first),
            line.text,
        ));
    }
    seen.insert(mangled, line.line);

    Ok(Block::new(kind, *name, line.line))
}

fn statement(kind: BlockKind, text: &str, line: usize) -> Result<Statement> {
    let (word, operand) = match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    };

    match Keyword::parse(word) {
        Some(keyword) => Ok(Statement::new(keyword, operand, line)),
        None if kind.allows_free_rows() => Ok(Statement {
            keyword: None,
            operand: text.to_string(),
            line,
        }),
        None => Err(CompileError::syntax(
            line,
            format!("statement in {} block must begin with a keyword", kind),
            text,
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
