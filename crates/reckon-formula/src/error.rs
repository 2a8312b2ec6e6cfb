//! Formula error types

use crate::operators::Arity;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while registering operators, parsing, compiling or
/// evaluating a formula
///
/// Parse and compile errors carry the byte offset into the formula text at
/// which they were detected. Evaluation errors are per call: a formula that
/// failed to evaluate can be evaluated again once the cause is fixed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Character that starts no token
    #[error("Unexpected character '{character}' at offset {offset}")]
    Lex { character: char, offset: usize },

    /// Unmatched `(` at end of input, or a stray `)`
    #[error("Unbalanced parentheses at offset {offset}")]
    UnbalancedParentheses { offset: usize },

    /// Ternary operator without its separator
    #[error("Operator '{symbol}' at offset {offset} has no matching '{separator}'")]
    UnmatchedTernary {
        symbol: String,
        separator: String,
        offset: usize,
    },

    /// Call of a name that is not in the function set
    #[error("Unknown function '{name}' at offset {offset}")]
    UnknownFunction { name: String, offset: usize },

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
        offset: usize,
    },

    /// Token that cannot appear where it was found
    #[error("Unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    /// Formula nests deeper than the configured limit
    #[error("Formula nests deeper than {limit} levels at offset {offset}")]
    MaxNestingExceeded { limit: usize, offset: usize },

    /// Operator already registered for this symbol and arity
    #[error("Operator '{symbol}' is already registered as {arity}")]
    DuplicateOperator { symbol: String, arity: Arity },

    /// Symbol that cannot be lexed as an operator
    #[error("Invalid operator symbol: '{0}'")]
    InvalidOperator(String),

    /// Operator referenced by the formula is no longer registered
    #[error("Operator '{symbol}' ({arity}) used at offset {offset} is not registered")]
    MissingOperator {
        symbol: String,
        arity: Arity,
        offset: usize,
    },

    /// Variable read while unbound
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    /// Division by zero (strict operators only)
    #[error("Division by zero")]
    DivideByZero,

    /// Failure raised by a user-supplied operator
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Formula has no text yet
    #[error("Formula has not been given any text to parse")]
    NotParsed,
}

impl FormulaError {
    /// Byte offset into the formula text, for errors that have one
    pub fn offset(&self) -> Option<usize> {
        match self {
            FormulaError::Lex { offset, .. }
            | FormulaError::UnbalancedParentheses { offset }
            | FormulaError::UnmatchedTernary { offset, .. }
            | FormulaError::UnknownFunction { offset, .. }
            | FormulaError::ArgumentCount { offset, .. }
            | FormulaError::UnexpectedToken { offset, .. }
            | FormulaError::MaxNestingExceeded { offset, .. }
            | FormulaError::MissingOperator { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        let err = FormulaError::Lex {
            character: '$',
            offset: 4,
        };
        assert_eq!(err.offset(), Some(4));
        assert_eq!(FormulaError::UnboundVariable("x".into()).offset(), None);
    }

    #[test]
    fn test_display() {
        let err = FormulaError::DuplicateOperator {
            symbol: "+".into(),
            arity: Arity::Binary,
        };
        assert_eq!(err.to_string(), "Operator '+' is already registered as binary");

        let err = FormulaError::ArgumentCount {
            function: "SQRT".into(),
            expected: "at most 1".into(),
            actual: 2,
            offset: 0,
        };
        assert_eq!(
            err.to_string(),
            "Wrong number of arguments for SQRT: expected at most 1, got 2"
        );
    }
}
