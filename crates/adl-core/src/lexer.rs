//! Tokenizer for ADL source lines and statement operands
//!
//! Two levels:
//! - [`source_lines`] strips comments and blank lines, keeping line numbers
//! - [`tokenize`] splits an operand expression into lossless tokens
//!   (concatenating every token's text yields the input unchanged)
//!
//! [`terms`] then groups tokens into dotted paths (`jets.pt`, `ns.f`) so the
//! rewriter can classify each reference once.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1, multispace1, one_of},
    combinator::{map, opt, recognize},
    multi::many0_count,
    sequence::{pair, preceded, tuple},
    IResult,
};

// ============================================================================
// Source lines
// ============================================================================

/// A non-blank, comment-stripped line of ADL source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number in the source text
    pub line: usize,
    pub text: &'a str,
}

/// Strip `#` comments and surrounding whitespace, dropping lines left empty.
pub fn source_lines(source: &str) -> Vec<SourceLine<'_>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let text = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            (!text.is_empty()).then_some(SourceLine {
                line: index + 1,
                text,
            })
        })
        .collect()
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Dot,
    Operator,
    /// `(` or `[`
    Open,
    /// `)` or `]`
    Close,
    Pipe,
    Comma,
    Whitespace,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// `12`, `2.4`, `1e-3`, `.5`; a trailing dot is never consumed so that
/// `Jets[0].pt` keeps its member access.
fn number(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((
            digit1,
            opt(preceded(char('.'), digit1)),
            opt(exponent),
        ))),
        recognize(tuple((char('.'), digit1, opt(exponent)))),
    ))(input)
}

fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        tag("=="),
        tag("!="),
        tag("<="),
        tag(">="),
        tag("=<"),
        tag("=>"),
        tag("&&"),
        tag("||"),
        recognize(one_of("=<>!+-*/%^?:&")),
    ))(input)
}

fn tok<'a>(kind: TokenKind) -> impl Fn(&'a str) -> Token<'a> {
    move |text| Token { kind, text }
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(multispace1, tok(TokenKind::Whitespace)),
        map(identifier, tok(TokenKind::Ident)),
        map(number, tok(TokenKind::Number)),
        map(tag("||"), tok(TokenKind::Operator)),
        map(tag("|"), tok(TokenKind::Pipe)),
        map(operator, tok(TokenKind::Operator)),
        map(recognize(char('.')), tok(TokenKind::Dot)),
        map(recognize(one_of("([")), tok(TokenKind::Open)),
        map(recognize(one_of(")]")), tok(TokenKind::Close)),
        map(recognize(char(',')), tok(TokenKind::Comma)),
        map(recognize(anychar), tok(TokenKind::Other)),
    ))(input)
}

/// Split an expression into tokens. Never fails: unknown characters become
/// [`TokenKind::Other`].
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        match token(rest) {
            Ok((next, tok)) if next.len() < rest.len() => {
                tokens.push(tok);
                rest = next;
            }
            _ => break,
        }
    }
    tokens
}

/// Identifier tokens of an expression, in order (duplicates kept)
pub fn identifiers(input: &str) -> Vec<&str> {
    tokenize(input)
        .into_iter()
        .filter(|t| t.is(TokenKind::Ident))
        .map(|t| t.text)
        .collect()
}

// ============================================================================
// Terms
// ============================================================================

/// Token groups as seen by the rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term<'a> {
    /// `a`, `a.b`, `ns.f`; `called` when followed by `(`
    Path { segments: Vec<&'a str>, called: bool },
    /// `.attr` directly after a closing bracket, e.g. `jets[0].pt`
    Member(&'a str),
    Token(Token<'a>),
}

impl<'a> Term<'a> {
    pub fn path(&self) -> Option<(&[&'a str], bool)> {
        match self {
            Term::Path { segments, called } => Some((segments.as_slice(), *called)),
            _ => None,
        }
    }
}

/// Group tokens into paths and member accesses.
pub fn terms<'a>(tokens: &[Token<'a>]) -> Vec<Term<'a>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        match tok.kind {
            TokenKind::Ident => {
                let mut segments = vec![tok.text];
                i += 1;
                while i + 1 < tokens.len()
                    && tokens[i].is(TokenKind::Dot)
                    && tokens[i + 1].is(TokenKind::Ident)
                {
                    segments.push(tokens[i + 1].text);
                    i += 2;
                }
                let called = tokens[i..]
                    .iter()
                    .find(|t| !t.is(TokenKind::Whitespace))
                    .is_some_and(|t| t.text == "(");
                out.push(Term::Path { segments, called });
            }
            TokenKind::Dot
                if i > 0
                    && tokens[i - 1].is(TokenKind::Close)
                    && tokens.get(i + 1).is_some_and(|t| t.is(TokenKind::Ident)) =>
            {
                out.push(Term::Member(tokens[i + 1].text));
                i += 2;
            }
            _ => {
                out.push(Term::Token(tok));
                i += 1;
            }
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_source_lines_strip_comments() {
        let src = "# header\n\nobject jets  # trailing\n   take Jet\n";
        let lines = source_lines(src);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], SourceLine { line: 3, text: "object jets" });
        assert_eq!(lines[1], SourceLine { line: 4, text: "take Jet" });
    }

    #[test]
    fn test_tokenize_is_lossless() {
        let input = "PT > 30 and abs(eta) < 2.4 || jets[0].pt >= 1e-3";
        let joined: String = tokenize(input).iter().map(|t| t.text).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_operators_maximal_munch() {
        let toks = kinds("a==b");
        assert_eq!(toks[1], (TokenKind::Operator, "=="));
        let toks = kinds("a = b");
        assert_eq!(toks[2], (TokenKind::Operator, "="));
        let toks = kinds("|x|");
        assert_eq!(toks[0], (TokenKind::Pipe, "|"));
    }

    #[test]
    fn test_number_keeps_member_dot() {
        let toks = kinds("0.pt");
        assert_eq!(toks[0], (TokenKind::Number, "0"));
        assert_eq!(toks[1], (TokenKind::Dot, "."));
        let toks = kinds("2.4");
        assert_eq!(toks, vec![(TokenKind::Number, "2.4")]);
    }

    #[test]
    fn test_terms_group_paths() {
        let tokens = tokenize("dR(eta, muons.eta) + jets[0].pt");
        let terms = terms(&tokens);
        assert_eq!(
            terms[0],
            Term::Path { segments: vec!["dR"], called: true }
        );
        assert!(terms.contains(&Term::Path {
            segments: vec!["muons", "eta"],
            called: false
        }));
        assert!(terms.contains(&Term::Member("pt")));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(identifiers("HTjets > 300 or met.pt"), vec!["HTjets", "or", "met", "pt"]);
    }
}
