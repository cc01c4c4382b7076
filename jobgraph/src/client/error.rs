use crate::core::RetryableError;
use thiserror::Error;

/// Errors surfaced by a [`super::ResourceClient`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The remote resource does not exist. Steps treat this as "no data".
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// The request failed in a way that may succeed later (timeout, 5xx,
    /// connection reset). Fatal to the calling step unless a retrying client
    /// absorbs it.
    #[error("transient network error: {message}")]
    TransientNetwork { message: String },

    /// The response did not have the expected shape.
    #[error("failed to decode {resource}")]
    Decode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            message: message.into(),
        }
    }

    pub fn decode(resource: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            resource: resource.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl RetryableError for ClientError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
