//! Jobgraph: step-dependency execution for platform integrations
//!
//! `jobgraph` runs independently written integration steps in dependency
//! order against one shared, run-scoped graph store. Fetch steps turn remote
//! resources into typed entities; later steps read those entities back
//! instead of fetching again, and infer relationships that cross-reference
//! what different steps produced.
//!
//! # Features
//!
//! - **Validated ordering**: unknown dependencies, duplicate ids and cycles
//!   are rejected before any step runs
//! - **Deterministic**: the same declarations always run in the same order
//! - **Typed store**: lazy per-type iteration, all-or-nothing batch writes
//! - **Bounded fan-out**: per-entity remote calls inside a step run
//!   concurrently up to a configured limit
//!
//! # Quick Start
//!
//! ```
//! use jobgraph::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InMemoryClient::new()
//!     .with_account(json!({ "id": 1, "name": "Admin", "username": "admin" }))
//!     .with_collection(
//!         ResourceKind::Users,
//!         vec![json!({ "id": 7, "name": "Grace", "username": "grace" })],
//!     );
//!
//! let state = Arc::new(InMemoryJobState::new());
//! let summary = Executor::new(ExecutorConfig::default())
//!     .run(&integration::steps(), state.clone(), Arc::new(client))
//!     .await?;
//!
//! assert_eq!(summary.steps.len(), 5);
//! assert_eq!(state.iter_entities(integration::USER_TYPE).count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`core`]: entities, relationships, identifiers and retry policy
//! - [`graph`]: the step dependency graph (hides the adjacency representation)
//! - [`storage`]: the job state store (hides indexing and locking)
//! - [`client`]: the remote resource contract and its implementations
//! - [`executor`]: planning and running steps
//! - [`integration`]: the GitLab steps

pub mod client;
pub mod core;
pub mod executor;
pub mod graph;
pub mod integration;
pub mod storage;

pub use crate::core::{CoreError, Entity, Relationship};

pub use crate::executor::{
    ExecutionError, Executor, ExecutorConfig, Result as ExecutionResult, RunSummary, Step,
    StepContext, StepError,
};

pub use crate::graph::{GraphError, StepId};

pub use crate::storage::{InMemoryJobState, JobState, StorageError};

pub use crate::client::{ClientError, ResourceClient, ResourceClientExt};

/// Prelude module for convenient glob imports
///
/// # Example
///
/// ```
/// use jobgraph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{
        ClientError, DetailKind, InMemoryClient, ResourceClient, ResourceClientExt,
        ResourceKind, RetryingClient,
    };

    pub use crate::core::{CompositeIdentifier, Entity, Identifier, Relationship, RetryPolicy};

    pub use crate::executor::{
        ExecutionError, Executor, ExecutorConfig, RunSummary, Step, StepContext, StepError,
        StepStatus,
    };

    pub use crate::graph::StepId;

    pub use crate::integration;

    pub use crate::storage::{InMemoryJobState, JobState};

    pub use std::sync::Arc;
}
