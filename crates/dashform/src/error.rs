// File: src/error.rs
// Purpose: Error types for form state and session handling

use thiserror::Error;

/// Errors raised by the form state container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The path is not part of the form's default-value shape
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// A declared field is absent from a replacement value
    #[error("missing field '{0}'")]
    MissingField(String),

    /// A replacement value would change the form's field structure
    #[error("field '{path}' expects {expected}, got {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The path could not be parsed (empty segment, empty string)
    #[error("invalid field path '{0}'")]
    InvalidPath(String),

    /// An array operation targeted a non-array value
    #[error("field '{0}' is not an array")]
    NotAnArray(String),

    #[error("index {index} is out of bounds for '{path}'")]
    IndexOutOfBounds { path: String, index: usize },

    /// Default values must be a JSON object
    #[error("default values must be an object, got {0}")]
    InvalidDefaults(&'static str),

    /// A structural change was requested while a submission is in flight
    #[error("form is busy submitting")]
    Busy,
}

/// Errors raised while persisting or restoring session state
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session data is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("tenant '{0}' is not available to this user")]
    UnknownTenant(String),
}

pub type FormResult<T> = Result<T, FormError>;
