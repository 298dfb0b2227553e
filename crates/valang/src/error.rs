// File: src/error.rs
// Purpose: Errors that can escape the validator (binding and declaration)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    /// A validator cannot exist without its form
    #[error("unable to find FORM element enclosing element with ID '{name}'")]
    MissingForm { name: String },

    #[error("unexpected form field: tag '{tag}', type '{kind}'")]
    UnsupportedField { tag: String, kind: String },

    #[error("invalid rule declaration: {0}")]
    Rules(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
