//! Firebird PLAN tokenizer
//!
//! Splits plan text into tokens one at a time. Each token kind owns an
//! anchored pattern; kinds are tried in a fixed priority order and the first
//! pattern that matches at the current position wins. The tokenizer never
//! fails: input that matches nothing becomes a one-character
//! [`TokenKind::Unrecognized`] token, and the end of input is reported as a
//! zero-length [`TokenKind::End`] token.

use regex::Regex;
use std::sync::LazyLock;
use strum::Display;

/// Kind of a plan token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Plan,
    Join,
    Hash,
    /// `SORT MERGE` with any whitespace between the two words
    SortMerge,
    Sort,
    Merge,
    Natural,
    Order,
    Index,
    LeftParen,
    RightParen,
    Comma,
    Whitespace,
    Identifier,
    Unrecognized,
    End,
}

/// A token and the place it was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Exact matched text
    pub text: &'a str,
    /// Byte offset of the first character
    pub offset: usize,
}

impl TokenKind {
    /// Returns true for kinds spelled as words
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Plan
                | Self::Join
                | Self::Hash
                | Self::SortMerge
                | Self::Sort
                | Self::Merge
                | Self::Natural
                | Self::Order
                | Self::Index
        )
    }
}

impl Token<'_> {
    /// Byte offset just past the token
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

// Order matters: SORT MERGE must be tried before SORT, keywords before identifiers.
// Keyword patterns carry no `\b`: the boundary is checked by `ends_word`, which
// also treats `$` as part of a word.
static TOKEN_PATTERNS: LazyLock<Vec<(TokenKind, Regex)>> = LazyLock::new(|| {
    [
        (TokenKind::Plan, r"^PLAN"),
        (TokenKind::Join, r"^JOIN"),
        (TokenKind::Hash, r"^HASH"),
        (TokenKind::SortMerge, r"^SORT\s+MERGE"),
        (TokenKind::Sort, r"^SORT"),
        (TokenKind::Merge, r"^MERGE"),
        (TokenKind::Natural, r"^NATURAL"),
        (TokenKind::Order, r"^ORDER"),
        (TokenKind::Index, r"^INDEX"),
        (TokenKind::LeftParen, r"^\("),
        (TokenKind::RightParen, r"^\)"),
        (TokenKind::Comma, r"^,"),
        (TokenKind::Whitespace, r"^\s+"),
        (
            TokenKind::Identifier,
            r#"^(?:"(?:[^"]|"")+"|[\w$]+(?:\.[\w$]+)*)"#,
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid token pattern")))
    .collect()
});

/// Reads the token starting at byte `position` of `text`.
///
/// Returns the token and the position just past it. Positions outside the
/// text (or not on a character boundary) yield [`TokenKind::End`].
///
/// ```
/// use qplan_analyzer::explain::firebird::tokenizer::{next_token, TokenKind};
///
/// let (token, next) = next_token("PLAN (T NATURAL)", 0);
/// assert_eq!(token.kind, TokenKind::Plan);
/// assert_eq!(next, 4);
/// ```
pub fn next_token(text: &str, position: usize) -> (Token<'_>, usize) {
    let Some(rest) = text.get(position..).filter(|rest| !rest.is_empty()) else {
        let end = position.min(text.len());
        return (
            Token {
                kind: TokenKind::End,
                text: "",
                offset: end,
            },
            end,
        );
    };

    for (kind, pattern) in TOKEN_PATTERNS.iter() {
        if let Some(found) = pattern.find(rest) {
            if found.start() == 0
                && !found.is_empty()
                && (!kind.is_keyword() || ends_word(&rest[found.end()..]))
            {
                let token = Token {
                    kind: *kind,
                    text: found.as_str(),
                    offset: position,
                };
                return (token, position + found.end());
            }
        }
    }

    let width = rest.chars().next().map_or(1, char::len_utf8);
    let token = Token {
        kind: TokenKind::Unrecognized,
        text: &rest[..width],
        offset: position,
    };
    (token, position + width)
}

// Same character class identifiers are built from
static WORD_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w$]").expect("valid word pattern"));

/// Returns true if a word ending right before `rest` is complete
fn ends_word(rest: &str) -> bool {
    !WORD_CHAR.is_match(rest)
}

/// Reads tokens from `position` until one that is not whitespace.
pub fn skip_to_significant_token(text: &str, mut position: usize) -> (Token<'_>, usize) {
    loop {
        let (token, next) = next_token(text, position);
        if token.kind != TokenKind::Whitespace {
            return (token, next);
        }
        position = next;
    }
}

/// Lazy, whitespace-skipping token stream over one plan string
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer positioned at the start of `text`
    pub fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    /// Current byte position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the next significant token and advances past it
    pub fn next_significant(&mut self) -> Token<'a> {
        let (token, next) = skip_to_significant_token(self.text, self.position);
        self.position = next;
        tracing::trace!(kind = %token.kind, text = token.text, offset = token.offset, "plan token");
        token
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    /// Yields significant tokens, stopping before [`TokenKind::End`]
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_significant();
        (token.kind != TokenKind::End).then_some(token)
    }
}

#[cfg(test)]
mod tests;
