//! Graph - Dependency graph for integration steps
//!
//! # Design
//!
//! The graph uses a bidirectional adjacency list representation:
//! - `successors`: steps that depend on this step (outgoing edges)
//! - `predecessors`: steps this step depends on (incoming edges)
//!
//! Edges are recorded without eager cycle checks; [`Graph::topological_sort`]
//! reports a cycle (with one of its members) when no valid order exists.

use super::error::{GraphError, GraphResult};
use super::StepId;
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A node in the step graph
///
/// Pure topology: execution state is tracked by the executor.
#[derive(Debug, Clone)]
pub struct StepNode {
    id: StepId,
    /// Declaration index, used to break ties deterministically
    position: usize,
    description: Option<String>,
    /// Steps that must complete before this step can run (incoming edges)
    predecessors: Vec<StepId>,
    /// Steps that depend on this step (outgoing edges)
    successors: Vec<StepId>,
}

impl StepNode {
    fn new(id: StepId, position: usize, description: Option<String>) -> Self {
        Self {
            id,
            position,
            description,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn id(&self) -> &StepId {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the predecessors (dependencies)
    pub fn predecessors(&self) -> &[StepId] {
        &self.predecessors
    }

    /// Returns the successors (dependents)
    pub fn successors(&self) -> &[StepId] {
        &self.successors
    }

    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
    }

    pub fn out_degree(&self) -> usize {
        self.successors.len()
    }
}

/// A directed graph of step dependencies
///
/// # Example
///
/// ```
/// use jobgraph::graph::{Graph, StepId};
///
/// let mut graph = Graph::new();
/// graph.add_step(StepId::new("fetch-users")).unwrap();
/// graph.add_step(StepId::new("fetch-merge-requests")).unwrap();
/// graph.add_step(StepId::new("build-approvals")).unwrap();
///
/// graph
///     .add_dependencies(
///         StepId::new("build-approvals"),
///         [StepId::new("fetch-merge-requests"), StepId::new("fetch-users")],
///     )
///     .unwrap();
///
/// let order = graph.topological_sort().unwrap();
/// assert_eq!(order.last(), Some(&StepId::new("build-approvals")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<StepId, StepNode>,
    /// Insertion order for deterministic iteration
    insertion_order: Vec<StepId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a step to the graph
    ///
    /// Returns an error if a step with the same ID already exists.
    pub fn add_step(&mut self, id: StepId) -> GraphResult<()> {
        self.insert_node(id, None)
    }

    /// Adds a step with a description
    pub fn add_step_with_description(
        &mut self,
        id: StepId,
        description: impl Into<String>,
    ) -> GraphResult<()> {
        self.insert_node(id, Some(description.into()))
    }

    fn insert_node(&mut self, id: StepId, description: Option<String>) -> GraphResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::duplicate_step(id));
        }

        let position = self.insertion_order.len();
        self.insertion_order.push(id.clone());
        self.nodes
            .insert(id.clone(), StepNode::new(id, position, description));
        Ok(())
    }

    /// Adds a dependency: `step` depends on `dependency`
    ///
    /// This means `dependency` must complete before `step` can run. Adding the
    /// same edge twice is a no-op. A self-dependency is accepted here and
    /// reported as a cycle by [`Graph::topological_sort`].
    pub fn add_dependency(&mut self, step: StepId, dependency: StepId) -> GraphResult<()> {
        if !self.nodes.contains_key(&step) {
            return Err(GraphError::step_not_found(step));
        }
        if !self.nodes.contains_key(&dependency) {
            return Err(GraphError::unknown_dependency(step, dependency));
        }

        if let Some(node) = self.nodes.get_mut(&step) {
            if node.predecessors.contains(&dependency) {
                return Ok(());
            }
            node.predecessors.push(dependency.clone());
        }
        if let Some(node) = self.nodes.get_mut(&dependency) {
            node.successors.push(step);
        }

        Ok(())
    }

    /// Adds multiple dependencies for a step at once
    pub fn add_dependencies(
        &mut self,
        step: StepId,
        dependencies: impl IntoIterator<Item = StepId>,
    ) -> GraphResult<()> {
        for dep in dependencies {
            self.add_dependency(step.clone(), dep)?;
        }
        Ok(())
    }

    pub fn get_step(&self, id: &StepId) -> Option<&StepNode> {
        self.nodes.get(id)
    }

    pub fn contains_step(&self, id: &StepId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns an iterator over all step IDs in insertion order
    pub fn step_ids(&self) -> impl Iterator<Item = &StepId> {
        self.insertion_order.iter()
    }

    /// Returns steps with no dependencies, in insertion order
    pub fn root_steps(&self) -> Vec<StepId> {
        self.nodes_in_order()
            .filter(|node| node.predecessors.is_empty())
            .map(|node| node.id.clone())
            .collect()
    }

    /// Returns steps nothing depends on, in insertion order
    pub fn leaf_steps(&self) -> Vec<StepId> {
        self.nodes_in_order()
            .filter(|node| node.successors.is_empty())
            .map(|node| node.id.clone())
            .collect()
    }

    fn nodes_in_order(&self) -> impl Iterator<Item = &StepNode> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Returns true if the graph contains a cycle
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Finds one cycle using DFS, returning its members in edge order
    ///
    /// Uses three-color marking:
    /// - White (not visited): not in any set
    /// - Gray (visiting): on `path`
    /// - Black (visited): in `visited` but not on `path`
    pub fn find_cycle(&self) -> Option<Vec<StepId>> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        for id in &self.insertion_order {
            if !visited.contains(id) {
                if let Some(cycle) = self.dfs_find_cycle(id, &mut visited, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn dfs_find_cycle(
        &self,
        node: &StepId,
        visited: &mut HashSet<StepId>,
        path: &mut Vec<StepId>,
    ) -> Option<Vec<StepId>> {
        visited.insert(node.clone());
        path.push(node.clone());

        if let Some(step_node) = self.nodes.get(node) {
            for successor in &step_node.successors {
                if let Some(start) = path.iter().position(|p| p == successor) {
                    // Back edge found
                    return Some(path[start..].to_vec());
                }
                if !visited.contains(successor) {
                    if let Some(cycle) = self.dfs_find_cycle(successor, visited, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        None
    }

    /// Returns a valid execution order of the steps
    ///
    /// Uses Kahn's algorithm. Among steps whose dependencies are all satisfied,
    /// the one declared first is emitted first, so the order is stable for a
    /// given declaration.
    ///
    /// Returns [`GraphError::CycleDetected`] naming a cycle member when no
    /// order exists.
    pub fn topological_sort(&self) -> GraphResult<Vec<StepId>> {
        let mut in_degrees: HashMap<&StepId, usize> = self
            .nodes
            .iter()
            .map(|(id, node)| (id, node.in_degree()))
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = self
            .nodes_in_order()
            .filter(|node| node.in_degree() == 0)
            .map(|node| Reverse(node.position))
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse(position)) = ready.pop() {
            let id = &self.insertion_order[position];
            result.push(id.clone());

            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for successor in &node.successors {
                if let Some(degree) = in_degrees.get_mut(successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(succ) = self.nodes.get(successor) {
                            ready.push(Reverse(succ.position));
                        }
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            let members = self.find_cycle().unwrap_or_else(|| {
                // Every unsorted step sits on or behind a cycle
                self.insertion_order
                    .iter()
                    .filter(|id| !result.contains(id))
                    .take(1)
                    .cloned()
                    .collect()
            });
            return Err(GraphError::cycle(&members));
        }

        Ok(result)
    }

    /// Renders the graph in Graphviz DOT format, edges pointing from a
    /// dependency to its dependent.
    ///
    /// Render with `dot -Tpng steps.dot -o steps.png`.
    pub fn to_dot(&self) -> String {
        let mut graph = DiGraph::<String, ()>::new();
        let mut indices = HashMap::new();

        for id in &self.insertion_order {
            indices.insert(id, graph.add_node(id.to_string()));
        }

        for node in self.nodes_in_order() {
            let target = indices[&node.id];
            for dep in &node.predecessors {
                if let Some(&source) = indices.get(dep) {
                    graph.add_edge(source, target, ());
                }
            }
        }

        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
