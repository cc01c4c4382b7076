use thiserror::Error;

/// Job state error type.
///
/// Both variants indicate a broken step, not a transient condition: the run
/// is aborted when a step surfaces one of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    /// An entity or relationship with this key was already added in this run.
    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },

    /// A relationship has an empty or malformed endpoint or class.
    #[error("invalid relationship '{key}': {reason}")]
    InvalidRelationship { key: String, reason: String },
}

impl StorageError {
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    pub fn invalid_relationship(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRelationship {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
