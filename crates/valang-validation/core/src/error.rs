//! Errors raised while evaluating a single rule.
//!
//! None of these ever reach the page: the evaluator catches them at the rule
//! boundary, logs them and counts the rule as failed.

use thiserror::Error;

/// Why two values could not be brought to a common type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionFailure {
    /// A date was compared with something that is not a date
    DateIncompatible,
    /// A value had to be a number but does not parse as one
    NotANumber { value: String },
}

impl std::fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoercionFailure::DateIncompatible => f.write_str("date-incompatible"),
            CoercionFailure::NotANumber { value } => {
                write!(f, "not-a-number: unable to convert value [{}] to number", value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValangError {
    #[error("type coercion failed: {0}")]
    TypeCoercion(CoercionFailure),

    #[error("arithmetic operand [{value}] is not a number")]
    NumericConversion { value: String },

    #[error("`{operator}` expects {expected} values, got {actual}")]
    Arity {
        operator: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("don't know how to apply {operation} to value '{value}'")]
    UnsupportedValue {
        operation: &'static str,
        value: String,
    },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ValangError {
    pub(crate) fn not_a_number(value: impl std::fmt::Display) -> Self {
        ValangError::TypeCoercion(CoercionFailure::NotANumber {
            value: value.to_string(),
        })
    }

    pub(crate) fn unsupported(operation: &'static str, value: impl std::fmt::Display) -> Self {
        ValangError::UnsupportedValue {
            operation,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValangError>;
