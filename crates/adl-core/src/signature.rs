//! C++ prototype decoding
//!
//! Function blocks name a header (`code deltaR.h`); the compiler scans that
//! header for prototypes and decodes the one matching the DSL function so it
//! can emit a forwarding shim with the right types.
//!
//! ```text
//! inline double deltaR(double eta1, double phi1, std::map<int, double> m = {})
//! ^^^^^^^^^^^^^ ^^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//! return type   name   parameters (template commas do not split)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// First identifier (possibly qualified) directly followed by `(`
static CALL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_]\w*(?:::[A-Za-z_~]\w*)*\s*\(").unwrap());

/// Prototype-shaped text starting on the return type line, up to `;` or `{`.
/// The name may sit on the line after its return type.
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:inline|static|extern|constexpr|const|unsigned)\s+)*[A-Za-z_][\w:]*(?:[ \t]*<[^;{()]*>)?[\s&\*]+[A-Za-z_][\w:]*[ \t]*\([^;{]*",
    )
    .unwrap()
});

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//[^\n]*").unwrap());

const STORAGE_SPECIFIERS: [&str; 4] = ["inline", "static", "extern", "constexpr"];

/// Statements that look like prototypes inside function bodies
const NOT_A_TYPE: [&str; 7] = ["return", "else", "new", "delete", "throw", "case", "goto"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can't decode function declaration '{text}'")]
pub struct SignatureError {
    pub text: String,
}

/// A decoded C++ prototype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub return_type: String,
    /// As declared, possibly qualified (`ns::f`)
    pub name: String,
    pub param_types: Vec<String>,
    /// Empty string for unnamed parameters
    pub param_names: Vec<String>,
}

impl FunctionSignature {
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    pub fn unqualified_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

/// Decode one prototype such as `int foo(vector<TLorentzVector> a, double b)`.
pub fn decode_signature(text: &str) -> Result<FunctionSignature, SignatureError> {
    let record = text.replace(['\n', '\r'], " ");
    let fail = || SignatureError {
        text: text.trim().to_string(),
    };

    let found = CALL_NAME.find(&record).ok_or_else(fail)?;
    let name = found.as_str().trim_end_matches('(').trim().to_string();

    let return_type = record[..found.start()]
        .split_whitespace()
        .filter(|word| !STORAGE_SPECIFIERS.contains(word))
        .collect::<Vec<_>>()
        .join(" ");

    // found.end() is just past the opening parenthesis
    let open = found.end() - 1;
    let close = matching_paren(&record, open).ok_or_else(fail)?;
    let args = record[open + 1..close].trim();

    let mut param_types = Vec::new();
    let mut param_names = Vec::new();
    if !args.is_empty() && args != "void" {
        for arg in split_top_level(args, ',') {
            let (ty, name) = split_parameter(arg);
            if ty.is_empty() {
                return Err(fail());
            }
            param_types.push(ty);
            param_names.push(name);
        }
    }

    Ok(FunctionSignature {
        return_type,
        name,
        param_types,
        param_names,
    })
}

/// Prototype-shaped statements of a header with comments removed
fn candidates(header: &str) -> Vec<String> {
    let without_blocks = BLOCK_COMMENT.replace_all(header, " ");
    let source = LINE_COMMENT.replace_all(&without_blocks, "");
    DECLARATION
        .find_iter(&source)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn is_declaration(sig: &FunctionSignature) -> bool {
    let first = sig.return_type.split_whitespace().next().unwrap_or_default();
    !sig.return_type.is_empty() && !NOT_A_TYPE.contains(&first)
}

/// First prototype in `header` whose unqualified name is `name`.
///
/// A prototype naming the function that cannot be decoded is an error
/// rather than a miss.
pub fn find_declaration(
    header: &str,
    name: &str,
) -> Result<Option<FunctionSignature>, SignatureError> {
    for text in candidates(header) {
        match decode_signature(&text) {
            Ok(sig) if is_declaration(&sig) && sig.unqualified_name() == name => {
                return Ok(Some(sig))
            }
            Ok(_) => {}
            Err(err) if CALL_NAME.find(&text).is_some_and(|m| {
                m.as_str().trim_end_matches('(').trim().rsplit("::").next() == Some(name)
            }) =>
            {
                return Err(err)
            }
            Err(err) => debug!("skipping header text: {}", err),
        }
    }
    Ok(None)
}

/// Byte index of the `)` matching the `(` at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside any `<>`, `()`, `[]` or `{}` group.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// `const T& name = default` -> (`const T&`, `name`)
fn split_parameter(arg: &str) -> (String, String) {
    let arg = split_top_level(arg, '=')[0];
    let words: Vec<&str> = arg.split_whitespace().collect();
    match words.as_slice() {
        [] => (String::new(), String::new()),
        [ty] => (ty.to_string(), String::new()),
        [ty @ .., last] => {
            let mut ty = ty.join(" ");
            let name = last.trim_start_matches(['*', '&']);
            ty.push_str(&last[..last.len() - name.len()]);
            (ty, name.to_string())
        }
    }
}
