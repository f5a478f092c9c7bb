//! Fatal compilation errors
//!
//! Any of these aborts the whole compilation; no fragment is produced.
//! Non-fatal findings are [`crate::diagnostics::Diagnostic`]s instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::ast::BlockKind;
use crate::signature::SignatureError;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed block header, statement outside a block, duplicate block
    /// name or missing keyword
    #[error("syntax error at line {line}: {message}\n{line:4} {text}")]
    Syntax {
        line: usize,
        message: String,
        text: String,
    },

    #[error("{}", located(.line, .message))]
    Semantic { line: Option<usize>, message: String },

    /// Header not found or no matching declaration in it
    #[error("resolution error: {message}")]
    Resolution { message: String },

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("circular dependency between {kind} blocks: {}", .blocks.join(", "))]
    CircularDependency { kind: BlockKind, blocks: Vec<String> },

    #[error(
        "nested implicit loops are not supported (line {line}): objects {} in '{statement}'",
        .objects.join(", ")
    )]
    NestedImplicitLoop {
        line: usize,
        objects: Vec<String>,
        statement: String,
    },

    #[error("template error: {0}")]
    Template(String),

    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn syntax(line: usize, message: impl Into<String>, text: impl Into<String>) -> Self {
        CompileError::Syntax {
            line,
            message: message.into(),
            text: text.into(),
        }
    }

    pub fn semantic(line: impl Into<Option<usize>>, message: impl Into<String>) -> Self {
        CompileError::Semantic {
            line: line.into(),
            message: message.into(),
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        CompileError::Resolution {
            message: message.into(),
        }
    }

    /// Source line the error points at, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Syntax { line, .. } | CompileError::NestedImplicitLoop { line, .. } => {
                Some(*line)
            }
            CompileError::Semantic { line, .. } => *line,
            _ => None,
        }
    }
}

impl From<handlebars::RenderError> for CompileError {
    fn from(err: handlebars::RenderError) -> Self {
        CompileError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for CompileError {
    fn from(err: handlebars::TemplateError) -> Self {
        CompileError::Template(err.to_string())
    }
}

impl From<std::fmt::Error> for CompileError {
    fn from(err: std::fmt::Error) -> Self {
        CompileError::Template(err.to_string())
    }
}

fn located(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("semantic error at line {}: {}", line, message),
        None => format!("semantic error: {}", message),
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
