use super::step::StepDescriptor;
use crate::graph::{Graph, GraphResult, StepId};

/// A validated execution order for a set of step descriptors.
///
/// Building a plan checks every declaration at once: duplicate ids, unknown
/// dependencies and cycles are all reported here, before anything runs.
#[derive(Debug, Clone)]
pub struct StepPlan {
    graph: Graph,
    order: Vec<StepId>,
}

impl StepPlan {
    pub fn new<'a>(descriptors: impl IntoIterator<Item = &'a StepDescriptor>) -> GraphResult<Self> {
        let descriptors: Vec<&StepDescriptor> = descriptors.into_iter().collect();
        let mut graph = Graph::new();

        for descriptor in &descriptors {
            graph.add_step_with_description(descriptor.id.clone(), descriptor.name.clone())?;
        }
        for descriptor in &descriptors {
            graph.add_dependencies(descriptor.id.clone(), descriptor.depends_on.iter().cloned())?;
        }

        let order = graph.topological_sort()?;
        Ok(Self { graph, order })
    }

    /// Steps in the order they run: dependencies first, ties broken by
    /// declaration order.
    pub fn order(&self) -> &[StepId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Direct dependencies of a step, in declaration order.
    pub fn dependencies(&self, step: &StepId) -> &[StepId] {
        self.graph
            .get_step(step)
            .map(|node| node.predecessors())
            .unwrap_or(&[])
    }

    /// Graphviz DOT rendering of the dependency graph.
    pub fn to_dot(&self) -> String {
        self.graph.to_dot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;

    fn descriptor(id: &str, deps: &[&str]) -> StepDescriptor {
        let mut d = StepDescriptor::new(id, id);
        d.depends_on = deps.iter().map(|dep| StepId::new(*dep)).collect();
        d
    }

    fn ids(plan: &StepPlan) -> Vec<&str> {
        plan.order().iter().map(StepId::as_str).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let steps = [
            descriptor("approvals", &["merge-requests", "users"]),
            descriptor("merge-requests", &["projects"]),
            descriptor("users", &[]),
            descriptor("projects", &["accounts"]),
            descriptor("accounts", &[]),
        ];

        let plan = StepPlan::new(&steps).unwrap();

        assert_eq!(
            ids(&plan),
            ["users", "accounts", "projects", "merge-requests", "approvals"]
        );
    }

    #[test]
    fn test_order_is_deterministic() {
        let steps = [
            descriptor("b", &[]),
            descriptor("a", &[]),
            descriptor("c", &["a", "b"]),
        ];

        let first = StepPlan::new(&steps).unwrap();
        for _ in 0..10 {
            assert_eq!(StepPlan::new(&steps).unwrap().order(), first.order());
        }
        assert_eq!(ids(&first), ["b", "a", "c"]);
    }

    #[test]
    fn test_unknown_dependency() {
        let steps = [descriptor("a", &["missing"])];
        let err = StepPlan::new(&steps).unwrap_err();
        assert_eq!(
            err,
            GraphError::unknown_dependency(StepId::new("a"), StepId::new("missing"))
        );
    }

    #[test]
    fn test_duplicate_step() {
        let steps = [descriptor("a", &[]), descriptor("a", &[])];
        assert!(matches!(
            StepPlan::new(&steps),
            Err(GraphError::DuplicateStep { .. })
        ));
    }

    #[test]
    fn test_cycle_names_a_member() {
        let steps = [
            descriptor("root", &[]),
            descriptor("a", &["root", "b"]),
            descriptor("b", &["a"]),
        ];

        match StepPlan::new(&steps) {
            Err(GraphError::CycleDetected { step, path }) => {
                assert!(step == "a" || step == "b");
                assert!(path.contains("a -> b") || path.contains("b -> a"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let steps = [descriptor("a", &["a"])];
        assert!(matches!(
            StepPlan::new(&steps),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_empty_plan() {
        let plan = StepPlan::new(std::iter::empty()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_dependencies_lookup() {
        let steps = [descriptor("a", &[]), descriptor("b", &["a"])];
        let plan = StepPlan::new(&steps).unwrap();
        assert_eq!(plan.dependencies(&StepId::new("b")), [StepId::new("a")]);
        assert!(plan.dependencies(&StepId::new("zzz")).is_empty());
    }
}
