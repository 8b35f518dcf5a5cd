//! Plan parsing errors
//!
//! Every failure while retrieving or parsing a plan is reported through
//! [`PlanError`]. Grammar errors carry a message that is rendered once, when
//! the error is raised, and already contains the caret-marked plan text.

use crate::explain::firebird::tokenizer::TokenKind;
use thiserror::Error;

/// Marker inserted after the offending character of a plan
pub const ERROR_MARKER: &str = "^^^";

/// Errors that can occur while retrieving or parsing an execution plan
#[derive(Debug, Error)]
pub enum PlanError {
    /// The parser required a specific token and found another one
    #[error("{message}")]
    ExpectedToken {
        expected: TokenKind,
        actual: TokenKind,
        offset: usize,
        plan: String,
        message: String,
    },

    /// The current token cannot continue any production
    #[error("{message}")]
    UnexpectedToken {
        actual: TokenKind,
        offset: usize,
        plan: String,
        message: String,
    },

    #[error("Plan is nested deeper than {limit} levels")]
    TooDeeplyNested { limit: usize },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid plan structure: {0}")]
    InvalidStructure(String),

    #[error("Empty execution plan")]
    EmptyPlan,

    #[error("Cannot fetch execution plan: {0}")]
    Source(String),
}

impl PlanError {
    /// Builds an expected-token error; `offset` is a character offset into `plan`
    pub fn expected_token(
        expected: TokenKind,
        actual: TokenKind,
        offset: usize,
        plan: &str,
    ) -> Self {
        let message = format!(
            "Error parsing plan - expected {} at position {} got {}\n{}",
            expected,
            offset,
            actual,
            mark_plan_error(plan, offset)
        );
        Self::ExpectedToken {
            expected,
            actual,
            offset,
            plan: plan.to_string(),
            message,
        }
    }

    /// Builds an unexpected-token error; `offset` is a character offset into `plan`
    pub fn unexpected_token(actual: TokenKind, offset: usize, plan: &str) -> Self {
        let message = format!(
            "Error parsing plan - unexpected token {} at position {}\n{}",
            actual,
            offset,
            mark_plan_error(plan, offset)
        );
        Self::UnexpectedToken {
            actual,
            offset,
            plan: plan.to_string(),
            message,
        }
    }

    /// Character offset of a grammar error, if this is one
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::ExpectedToken { offset, .. } | Self::UnexpectedToken { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

/// Result type for plan retrieval and parsing
pub type Result<T> = std::result::Result<T, PlanError>;

/// Inserts [`ERROR_MARKER`] right after the character at `offset`.
///
/// Offsets at or past the end of `plan` put the marker at the end.
///
/// ```
/// use qplan_analyzer::explain::mark_plan_error;
///
/// assert_eq!(mark_plan_error("PLAN BADTOKEN", 5), "PLAN B^^^ADTOKEN");
/// assert_eq!(mark_plan_error("PLAN", 10), "PLAN^^^");
/// ```
pub fn mark_plan_error(plan: &str, offset: usize) -> String {
    let insert_at = plan
        .char_indices()
        .nth(offset.saturating_add(1))
        .map_or(plan.len(), |(i, _)| i);

    let mut marked = String::with_capacity(plan.len() + ERROR_MARKER.len());
    marked.push_str(&plan[..insert_at]);
    marked.push_str(ERROR_MARKER);
    marked.push_str(&plan[insert_at..]);
    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_plan_error_inside_text() {
        assert_eq!(mark_plan_error("PLAN (T1 NATURAL", 0), "P^^^LAN (T1 NATURAL");
        assert_eq!(mark_plan_error("ab", 0), "a^^^b");
    }

    #[test]
    fn test_mark_plan_error_at_end() {
        assert_eq!(mark_plan_error("PLAN JOIN(", 10), "PLAN JOIN(^^^");
        assert_eq!(mark_plan_error("", 0), "^^^");
    }

    #[test]
    fn test_mark_plan_error_multibyte() {
        assert_eq!(mark_plan_error("PLAN ÄB", 5), "PLAN Ä^^^B");
    }

    #[test]
    fn test_expected_token_message() {
        let err = PlanError::expected_token(
            TokenKind::RightParen,
            TokenKind::End,
            20,
            "PLAN JOIN(T1 NATURAL",
        );
        assert_eq!(
            err.to_string(),
            "Error parsing plan - expected RIGHT_PAREN at position 20 got END\nPLAN JOIN(T1 NATURAL^^^"
        );
        assert_eq!(err.offset(), Some(20));
    }

    #[test]
    fn test_unexpected_token_message() {
        let err = PlanError::unexpected_token(TokenKind::Identifier, 5, "PLAN BADTOKEN");
        assert_eq!(
            err.to_string(),
            "Error parsing plan - unexpected token IDENTIFIER at position 5\nPLAN B^^^ADTOKEN"
        );
    }

    #[test]
    fn test_non_grammar_errors_have_no_offset() {
        assert_eq!(PlanError::EmptyPlan.offset(), None);
        assert_eq!(PlanError::TooDeeplyNested { limit: 3 }.offset(), None);
    }
}
