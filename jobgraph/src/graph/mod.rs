//! Dependency graph for integration steps
//!
//! This module provides the graph structure and algorithms used to order
//! steps before a run:
//!
//! - Explicit dependency declaration between steps
//! - Topological sorting for a valid, deterministic execution order
//! - Cycle detection naming a member of the offending cycle
//!
//! # Design Principles
//!
//! This module hides the graph representation (adjacency lists keyed by
//! step id) and exposes only abstract operations: add_step, add_dependency,
//! topological_sort, find_cycle.
//!
//! # Algorithm References
//!
//! - Kahn's algorithm for topological sort, with a min-heap on declaration
//!   order for tie-breaking
//! - Three-color DFS for cycle detection

mod error;
mod step_graph;
mod step_id;

pub use error::{GraphError, GraphResult};
pub use step_graph::{Graph, StepNode};
pub use step_id::StepId;
