//! Expression error types

use thiserror::Error;

/// Errors raised while parsing or evaluating a derived-column expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Blank expression text
    #[error("Expression is empty")]
    Empty,

    /// Text does not match the grammar
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Identifier that is not a column of the table
    #[error("Unknown column '{name}' (available: {available})")]
    UnknownColumn { name: String, available: String },

    #[error("Division by zero at row {row}")]
    DivisionByZero { row: usize },
}

impl ExpressionError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
