//! Line classification for embedded test directives.
//!
//! A directive rides on a statement line as a comment with one extra marker
//! character:
//!
//! ```text
//! cube([3, 3, 3]); ///ASSERT:volume=27
//! ```
//!
//! Only a line carrying both a call-like statement (`name(...);`) in front of
//! the marker and the `///` marker itself is a test line. Everything else is
//! ordinary source and is skipped silently. Multi-line statements are not
//! followed: the call terminator and the directive must share one physical line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordinary line comment marker.
pub const COMMENT_MARKER: &str = "//";
/// Directive marker; a comment marker plus one more slash.
pub const DIRECTIVE_MARKER: &str = "///";

static CALL_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".?\(.*\)\s*;").expect("call statement pattern is valid"));

/// What a single physical source line is, as far as the harness cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Only whitespace.
    Blank,
    /// A line whose first non-blank text is a comment.
    Comment,
    /// Source code without a directive.
    Code,
    /// A statement carrying a directive; holds the whitespace-free payload.
    Directive(String),
}

impl LineKind {
    pub fn payload(&self) -> Option<&str> {
        match self {
            LineKind::Directive(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Classifies one source line (without its line terminator).
pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    if let Some((code, directive)) = line.split_once(DIRECTIVE_MARKER) {
        if is_statement(code) {
            return LineKind::Directive(strip_whitespace(directive));
        }
    }

    if trimmed.starts_with(COMMENT_MARKER) {
        LineKind::Comment
    } else {
        LineKind::Code
    }
}

/// True when `code` ends a call-like statement.
pub fn is_statement(code: &str) -> bool {
    CALL_STATEMENT.is_match(code)
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
