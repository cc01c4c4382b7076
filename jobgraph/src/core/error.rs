use thiserror::Error;

/// Core error type for the jobgraph data model.
///
/// Raised when a stored key does not have the shape a step relies on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// An entity key could not be decomposed into its namespace and numeric ids.
    #[error("invalid identifier '{key}': {reason}")]
    InvalidIdentifier { key: String, reason: String },
}

impl CoreError {
    /// Creates an invalid identifier error for `key`.
    pub fn invalid_identifier(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
