//! Core types for the jobgraph engine.
//!
//! # Data Model
//! - [`Entity`]: A graph node with a run-unique key, a type tag and a class
//! - [`Relationship`]: A directed, classed edge between two entity keys
//!
//! # Identifiers
//! - [`Identifier`]: `"<namespace>:<remoteId>"`
//! - [`CompositeIdentifier`]: a resource id nested inside a parent scope id
//!
//! # Error Handling
//! - [`CoreError`]: Core error type
//! - [`Result<T>`]: Type alias for Results using CoreError
//!
//! # Retry Behavior
//! - [`RetryPolicy`]: Attempts and backoff for remote calls
//! - [`RetryableError`]: Which errors are worth another attempt

mod entity;
mod error;
mod identifier;
pub mod retry;

pub use entity::{
    relationship_key, relationship_type, Attributes, Entity, Relationship,
    RELATIONSHIP_KEY_DELIMITER,
};
pub use error::{CoreError, Result};
pub use identifier::{CompositeIdentifier, Identifier, DELIMITER};
pub use retry::{retry_with_policy, RetryPolicy, RetryableError};
