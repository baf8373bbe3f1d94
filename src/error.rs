//! Error types for compiling filter expressions.

use thiserror::Error;

use crate::dsl::CompareOp;

/// A malformed token in the expression text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("lex error at offset {position}: expected {expected}, found {}", found_label(.found))]
pub struct LexError {
    /// Byte offset into the decoded expression text.
    pub position: usize,
    pub expected: String,
    pub found: Option<char>,
}

/// A grammar violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at offset {position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no comparison registered for operator '{0}'")]
    UnknownOperator(CompareOp),

    #[error("no function registered with name '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}()' takes {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("parameter '${0}' is not bound")]
    UnboundParameter(String),

    #[error("invalid argument for '{operator}': {message}")]
    InvalidArgument { operator: String, message: String },

    #[error("unsupported character encoding '{0}'")]
    UnsupportedEncoding(String),
}

fn found_label(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{}'", c.escape_default()),
        None => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_names_end_of_input() {
        let err = LexError {
            position: 7,
            expected: "closing ']'".into(),
            found: None,
        };
        assert_eq!(
            err.to_string(),
            "lex error at offset 7: expected closing ']', found end of input"
        );
    }

    #[test]
    fn filter_error_is_transparent_over_parse_errors() {
        let err: FilterError = ParseError {
            position: 3,
            expected: "operand".into(),
            found: "')'".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "parse error at offset 3: expected operand, found ')'"
        );
    }
}
