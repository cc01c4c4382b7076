//! Step execution engine.
//!
//! A [`Step`] couples a [`StepDescriptor`] (id, produced types, dependencies)
//! with an async handler. The [`Executor`] turns a set of steps into a
//! [`StepPlan`], rejecting broken declarations before anything runs, and then
//! invokes the handlers one at a time in plan order. Every handler receives a
//! [`StepContext`] holding the run's job state and resource client.
//!
//! Steps never run concurrently with each other. A step may fan out its own
//! remote calls, bounded by [`ExecutorConfig::max_concurrent_requests`].
//!
//! # Example
//!
//! ```
//! use jobgraph::client::InMemoryClient;
//! use jobgraph::core::Entity;
//! use jobgraph::executor::{Executor, Step};
//! use jobgraph::storage::{InMemoryJobState, JobState};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let steps = vec![
//!     Step::new("fetch-users", "Fetch users", |ctx| async move {
//!         ctx.job_state()
//!             .add_entity(Entity::new("gitlab-user:7", "gitlab_user", "User", "7"))
//!             .await?;
//!         Ok(())
//!     })
//!     .produces("gitlab_user"),
//! ];
//!
//! let state = Arc::new(InMemoryJobState::new());
//! let summary = Executor::default()
//!     .run(&steps, state.clone(), Arc::new(InMemoryClient::new()))
//!     .await?;
//!
//! assert_eq!(summary.entities_added(), 1);
//! assert_eq!(state.entity_count(), 1);
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod error;
mod execution;
mod plan;
mod step;

pub use config::ExecutorConfig;
pub use context::StepContext;
pub use error::{ExecutionError, Result, StepError};
pub use execution::{Executor, RunSummary, StepOutcome, StepStatus};
pub use plan::StepPlan;
pub use step::{Step, StepDescriptor, StepFuture};
