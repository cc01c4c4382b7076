use super::context::StepContext;
use super::error::StepError;
use crate::graph::StepId;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a step handler.
pub type StepFuture = BoxFuture<'static, Result<(), StepError>>;

type StepHandler = Arc<dyn Fn(StepContext) -> StepFuture + Send + Sync>;

/// Static description of a step: what it is called, what it writes, and
/// which steps must finish before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    pub id: StepId,
    pub name: String,
    /// Entity and relationship types the step is expected to write
    pub produced_types: BTreeSet<String>,
    pub depends_on: Vec<StepId>,
}

impl StepDescriptor {
    pub fn new(id: impl Into<StepId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            produced_types: BTreeSet::new(),
            depends_on: Vec::new(),
        }
    }
}

/// A descriptor bound to the handler that does the work.
///
/// # Example
///
/// ```
/// use jobgraph::executor::Step;
///
/// let step = Step::new("fetch-users", "Fetch users", |ctx| async move {
///     let _ = ctx.job_state().entity_count();
///     Ok(())
/// })
/// .produces("gitlab_user")
/// .depends_on("fetch-accounts");
///
/// assert_eq!(step.descriptor().depends_on.len(), 1);
/// ```
#[derive(Clone)]
pub struct Step {
    descriptor: StepDescriptor,
    handler: StepHandler,
}

impl Step {
    pub fn new<F, Fut>(id: impl Into<StepId>, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        Self {
            descriptor: StepDescriptor::new(id, name),
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
        }
    }

    pub fn produces(mut self, produced_type: impl Into<String>) -> Self {
        self.descriptor.produced_types.insert(produced_type.into());
        self
    }

    pub fn depends_on(mut self, step: impl Into<StepId>) -> Self {
        let step = step.into();
        if !self.descriptor.depends_on.contains(&step) {
            self.descriptor.depends_on.push(step);
        }
        self
    }

    pub fn id(&self) -> &StepId {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    pub(crate) fn invoke(&self, ctx: StepContext) -> StepFuture {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
