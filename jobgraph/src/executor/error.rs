use crate::client::ClientError;
use crate::core::CoreError;
use crate::graph::{GraphError, StepId};
use crate::storage::StorageError;
use thiserror::Error;

/// Failure of a single step handler.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StepError {
    /// The job state rejected a write.
    #[error(transparent)]
    State(#[from] StorageError),

    /// A remote call failed in a way the step could not recover from.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A stored key could not be parsed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Any other step-specific failure.
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Execution layer error: the run either never started or stopped at a step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The step declarations do not form a valid dependency graph. Reported
    /// before any handler runs.
    #[error("invalid step graph: {0}")]
    Graph(#[from] GraphError),

    /// A step failed; steps before it stay committed in the job state.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: StepId,
        #[source]
        source: StepError,
    },
}

impl ExecutionError {
    /// The failing step, if the run got as far as running one.
    pub fn step(&self) -> Option<&StepId> {
        match self {
            Self::StepFailed { step, .. } => Some(step),
            Self::Graph(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
