//! Error types for graph operations
//!
//! Every variant describes a broken step declaration, not a runtime
//! condition: they are reported before any step handler runs.

use super::StepId;
use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while building or ordering the step graph
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// A cycle was detected in the dependency graph
    #[error("Cycle detected in dependency graph at step '{step}': {path}")]
    CycleDetected {
        /// One step that is a member of the cycle
        step: StepId,
        /// Human-readable description of the cycle path
        path: String,
    },

    /// A step was not found in the graph
    #[error("Step not found: {step_id}")]
    StepNotFound {
        /// The step ID that was not found
        step_id: StepId,
    },

    /// A dependency references a step that was never declared
    #[error("Dependency '{dependency}' for step '{step}' does not exist")]
    UnknownDependency {
        /// The step that declared the dependency
        step: StepId,
        /// The dependency that was not found
        dependency: StepId,
    },

    /// A step was added with a duplicate ID
    #[error("Duplicate step ID: {step_id}")]
    DuplicateStep {
        /// The duplicate step ID
        step_id: StepId,
    },
}

impl GraphError {
    /// Creates a cycle detected error from the steps on the cycle, in order
    pub fn cycle(members: &[StepId]) -> Self {
        let path = members
            .iter()
            .chain(members.first())
            .map(StepId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::CycleDetected {
            step: members.first().cloned().unwrap_or_else(|| StepId::new("")),
            path,
        }
    }

    /// Creates a step not found error
    pub fn step_not_found(step_id: StepId) -> Self {
        Self::StepNotFound { step_id }
    }

    /// Creates an unknown dependency error
    pub fn unknown_dependency(step: StepId, dependency: StepId) -> Self {
        Self::UnknownDependency { step, dependency }
    }

    /// Creates a duplicate step error
    pub fn duplicate_step(step_id: StepId) -> Self {
        Self::DuplicateStep { step_id }
    }
}
