use super::config::ExecutorConfig;
use crate::client::ResourceClient;
use crate::graph::StepId;
use crate::storage::JobState;
use std::sync::Arc;
use uuid::Uuid;

/// What a step handler gets to work with.
///
/// Cheap to clone: everything inside is shared. The job state seen here is
/// the step's own tracking view of the run's store.
#[derive(Clone)]
pub struct StepContext {
    step_id: StepId,
    run_id: Uuid,
    job_state: Arc<dyn JobState>,
    client: Arc<dyn ResourceClient>,
    config: Arc<ExecutorConfig>,
}

impl StepContext {
    pub fn new(
        step_id: StepId,
        run_id: Uuid,
        job_state: Arc<dyn JobState>,
        client: Arc<dyn ResourceClient>,
        config: Arc<ExecutorConfig>,
    ) -> Self {
        Self {
            step_id,
            run_id,
            job_state,
            client,
            config,
        }
    }

    pub fn step_id(&self) -> &StepId {
        &self.step_id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn job_state(&self) -> &Arc<dyn JobState> {
        &self.job_state
    }

    pub fn client(&self) -> &Arc<dyn ResourceClient> {
        &self.client
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}
