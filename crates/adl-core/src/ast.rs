//! ADL document model
//!
//! An ADL file is a flat sequence of named, typed blocks. Each block body is
//! an ordered list of statements, each introduced by a reserved keyword:
//!
//! ```text
//! object goodJets            <- block header: <blocktype> <name>
//!   take Jet                 <- statement: <keyword> <operand>
//!   select pt > 30 and
//!          abs(eta) < 2.4    <- continuation of the previous statement
//! ```
//!
//! Names are kept raw here; mangling happens at emission time
//! (see [`crate::symbols::mangle`]).

use serde::{Deserialize, Serialize};

// =============================================================================
// BLOCK KINDS
// =============================================================================

/// The six block types of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Info,
    Table,
    Function,
    Object,
    Variable,
    Cut,
}

impl BlockKind {
    pub const ALL: [BlockKind; 6] = [
        BlockKind::Info,
        BlockKind::Table,
        BlockKind::Function,
        BlockKind::Object,
        BlockKind::Variable,
        BlockKind::Cut,
    ];

    /// Recognise a block-type token, ignoring case
    pub fn parse(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(word))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Info => "info",
            BlockKind::Table => "table",
            BlockKind::Function => "function",
            BlockKind::Object => "object",
            BlockKind::Variable => "variable",
            BlockKind::Cut => "cut",
        }
    }

    /// Blocks whose bodies may contain rows that do not start with a keyword
    pub fn allows_free_rows(&self) -> bool {
        matches!(self, BlockKind::Info | BlockKind::Table)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// KEYWORDS
// =============================================================================

/// Statement keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    // info block
    Experiment,
    Id,
    Publication,
    SqrtS,
    Lumi,
    ArXiv,
    Hepdata,
    Doi,
    // function block
    Arg,
    Code,
    // object / cut / variable blocks
    Take,
    Select,
    Apply,
    Reject,
}

impl Keyword {
    pub const ALL: [Keyword; 14] = [
        Keyword::Experiment,
        Keyword::Id,
        Keyword::Publication,
        Keyword::SqrtS,
        Keyword::Lumi,
        Keyword::ArXiv,
        Keyword::Hepdata,
        Keyword::Doi,
        Keyword::Arg,
        Keyword::Code,
        Keyword::Take,
        Keyword::Select,
        Keyword::Apply,
        Keyword::Reject,
    ];

    /// Recognise a keyword token, ignoring case
    pub fn parse(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kw| kw.as_str().eq_ignore_ascii_case(word))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Experiment => "experiment",
            Keyword::Id => "id",
            Keyword::Publication => "publication",
            Keyword::SqrtS => "sqrtS",
            Keyword::Lumi => "lumi",
            Keyword::ArXiv => "arXiv",
            Keyword::Hepdata => "hepdata",
            Keyword::Doi => "doi",
            Keyword::Arg => "arg",
            Keyword::Code => "code",
            Keyword::Take => "take",
            Keyword::Select => "select",
            Keyword::Apply => "apply",
            Keyword::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for any token that terminates a pending statement
/// (a block type or a statement keyword).
pub fn is_reserved(word: &str) -> bool {
    BlockKind::parse(word).is_some() || Keyword::parse(word).is_some()
}

// =============================================================================
// STATEMENTS AND BLOCKS
// =============================================================================

/// One logical instruction, possibly assembled from several source lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// `None` only for free-form rows of info and table blocks
    pub keyword: Option<Keyword>,
    pub operand: String,
    /// Line on which the statement starts (1-based)
    pub line: usize,
}

impl Statement {
    pub fn new(keyword: Keyword, operand: impl Into<String>, line: usize) -> Self {
        Self {
            keyword: Some(keyword),
            operand: operand.into(),
            line,
        }
    }

    pub fn is(&self, keyword: Keyword) -> bool {
        self.keyword == Some(keyword)
    }

    /// First whitespace-separated word of the operand
    pub fn first_word(&self) -> Option<&str> {
        self.operand.split_whitespace().next()
    }

    /// Statement as written (keyword and operand)
    pub fn text(&self) -> String {
        match self.keyword {
            Some(kw) if self.operand.is_empty() => kw.to_string(),
            Some(kw) => format!("{} {}", kw, self.operand),
            None => self.operand.clone(),
        }
    }
}

/// A named, typed section of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub kind: BlockKind,
    /// Line of the block header (1-based)
    pub line: usize,
    pub body: Vec<Statement>,
}

impl Block {
    pub fn new(kind: BlockKind, name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            body: Vec::new(),
        }
    }

    /// Statements introduced by `keyword`, in declaration order
    pub fn statements(&self, keyword: Keyword) -> impl Iterator<Item = &Statement> {
        self.body.iter().filter(move |s| s.is(keyword))
    }
}

/// A parsed ADL document; blocks are kept in document order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn blocks_of(&self, kind: BlockKind) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    pub fn count(&self, kind: BlockKind) -> usize {
        self.blocks_of(kind).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind_is_case_insensitive() {
        assert_eq!(BlockKind::parse("object"), Some(BlockKind::Object));
        assert_eq!(BlockKind::parse("OBJECT"), Some(BlockKind::Object));
        assert_eq!(BlockKind::parse("Cut"), Some(BlockKind::Cut));
        assert_eq!(BlockKind::parse("objects"), None);
    }

    #[test]
    fn test_keyword_mixed_case() {
        assert_eq!(Keyword::parse("sqrts"), Some(Keyword::SqrtS));
        assert_eq!(Keyword::parse("ARXIV"), Some(Keyword::ArXiv));
        assert_eq!(Keyword::parse("Select"), Some(Keyword::Select));
        assert_eq!(Keyword::parse("histo"), None);
    }

    #[test]
    fn test_reserved_tokens() {
        assert!(is_reserved("take"));
        assert!(is_reserved("variable"));
        assert!(!is_reserved("pt"));
    }

    #[test]
    fn test_statement_text() {
        let stmt = Statement::new(Keyword::Select, "pt > 30", 4);
        assert_eq!(stmt.text(), "select pt > 30");
        assert_eq!(stmt.first_word(), Some("pt"));
    }
}
