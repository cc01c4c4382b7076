use super::config::ExecutorConfig;
use super::context::StepContext;
use super::error::{ExecutionError, Result, StepError};
use super::plan::StepPlan;
use super::step::Step;
use crate::client::ResourceClient;
use crate::graph::StepId;
use crate::storage::{JobState, TypeTrackingJobState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How a step ended in a run that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    /// Skipped through [`ExecutorConfig::disabled_steps`]
    Disabled,
}

/// Per-step record of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step_id: StepId,
    pub status: StepStatus,
    pub entities_added: usize,
    pub relationships_added: usize,
    /// Types the step actually wrote
    pub encountered_types: BTreeSet<String>,
    /// Written but missing from the step's `produced_types`
    pub undeclared_types: BTreeSet<String>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl StepOutcome {
    fn disabled(step_id: StepId) -> Self {
        Self {
            step_id,
            status: StepStatus::Disabled,
            entities_added: 0,
            relationships_added: 0,
            encountered_types: BTreeSet::new(),
            undeclared_types: BTreeSet::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }
}

/// Result of a run in which every enabled step succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// One entry per step, in execution order
    pub steps: Vec<StepOutcome>,
}

impl RunSummary {
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|outcome| outcome.step_id == step)
    }

    /// Step ids in the order they ran (or were skipped).
    pub fn order(&self) -> Vec<&StepId> {
        self.steps.iter().map(|outcome| &outcome.step_id).collect()
    }

    pub fn entities_added(&self) -> usize {
        self.steps.iter().map(|outcome| outcome.entities_added).sum()
    }

    pub fn relationships_added(&self) -> usize {
        self.steps.iter().map(|outcome| outcome.relationships_added).sum()
    }
}

/// Runs steps one at a time in dependency order.
///
/// The executor owns no state between runs. Each call to [`Executor::run`]
/// validates the step graph, then invokes every enabled handler exactly once
/// with the job state and client it was given. The first failing step stops
/// the run; whatever earlier steps committed stays in the job state.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: Arc<ExecutorConfig>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validates `steps` and returns the order they would run in.
    pub fn plan(&self, steps: &[Step]) -> Result<StepPlan> {
        Ok(StepPlan::new(steps.iter().map(Step::descriptor))?)
    }

    pub async fn run(
        &self,
        steps: &[Step],
        job_state: Arc<dyn JobState>,
        client: Arc<dyn ResourceClient>,
    ) -> Result<RunSummary> {
        let plan = self.plan(steps)?;
        let by_id: HashMap<&StepId, &Step> = steps.iter().map(|step| (step.id(), step)).collect();

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        info!(%run_id, steps = plan.len(), "starting run");

        let mut outcomes = Vec::with_capacity(plan.len());
        for step_id in plan.order() {
            let Some(step) = by_id.get(step_id) else {
                continue;
            };

            if self.config.is_disabled(step_id.as_str()) {
                info!(%run_id, step_id = %step_id, "step disabled, skipping");
                outcomes.push(StepOutcome::disabled(step_id.clone()));
                continue;
            }

            let outcome = self
                .run_step(step, run_id, &job_state, &client)
                .await
                .map_err(|source| ExecutionError::StepFailed {
                    step: step_id.clone(),
                    source,
                })?;
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            run_id,
            started_at,
            duration: timer.elapsed(),
            steps: outcomes,
        };
        info!(
            %run_id,
            entities = summary.entities_added(),
            relationships = summary.relationships_added(),
            duration_ms = summary.duration.as_millis() as u64,
            "run completed"
        );
        Ok(summary)
    }

    async fn run_step(
        &self,
        step: &Step,
        run_id: Uuid,
        job_state: &Arc<dyn JobState>,
        client: &Arc<dyn ResourceClient>,
    ) -> std::result::Result<StepOutcome, StepError> {
        let descriptor = step.descriptor();
        let span = info_span!("step", step_id = %descriptor.id, run_id = %run_id);

        let tracking = Arc::new(TypeTrackingJobState::new(Arc::clone(job_state)));
        let ctx = StepContext::new(
            descriptor.id.clone(),
            run_id,
            Arc::clone(&tracking) as Arc<dyn JobState>,
            Arc::clone(client),
            Arc::clone(&self.config),
        );

        let started_at = Utc::now();
        let timer = Instant::now();
        span.in_scope(|| info!(name = %descriptor.name, "step started"));

        let result = step.invoke(ctx).instrument(span.clone()).await;
        let duration = timer.elapsed();

        let _entered = span.enter();
        if let Err(e) = result {
            error!(
                error = %e,
                entities = tracking.entities_added(),
                relationships = tracking.relationships_added(),
                "step failed"
            );
            return Err(e);
        }

        let encountered_types = tracking.encountered_types();
        let undeclared_types: BTreeSet<String> = encountered_types
            .difference(&descriptor.produced_types)
            .cloned()
            .collect();
        if !undeclared_types.is_empty() {
            warn!(?undeclared_types, "step produced types it did not declare");
        }

        info!(
            entities = tracking.entities_added(),
            relationships = tracking.relationships_added(),
            duration_ms = duration.as_millis() as u64,
            "step completed"
        );

        Ok(StepOutcome {
            step_id: descriptor.id.clone(),
            status: StepStatus::Succeeded,
            entities_added: tracking.entities_added(),
            relationships_added: tracking.relationships_added(),
            encountered_types,
            undeclared_types,
            started_at,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClient;
    use crate::core::Entity;
    use crate::graph::GraphError;
    use crate::storage::InMemoryJobState;
    use std::sync::Mutex;

    fn harness() -> (Arc<dyn JobState>, Arc<dyn ResourceClient>) {
        (
            Arc::new(InMemoryJobState::new()),
            Arc::new(InMemoryClient::new()),
        )
    }

    fn recording(id: &str, log: &Arc<Mutex<Vec<String>>>) -> Step {
        let log = Arc::clone(log);
        let name = id.to_string();
        Step::new(id, id, move |_ctx| {
            let log = Arc::clone(&log);
            let name = name.clone();
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_runs_each_step_once_in_dependency_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording("approvals", &log)
                .depends_on("merge-requests")
                .depends_on("users"),
            recording("merge-requests", &log),
            recording("users", &log),
        ];
        let (state, client) = harness();

        let summary = Executor::default().run(&steps, state, client).await.unwrap();

        let ran = log.lock().unwrap().clone();
        assert_eq!(ran, ["merge-requests", "users", "approvals"]);
        assert_eq!(summary.steps.len(), 3);
        assert!(summary
            .steps
            .iter()
            .all(|outcome| outcome.status == StepStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording("independent", &log),
            recording("a", &log).depends_on("b"),
            recording("b", &log).depends_on("a"),
        ];
        let (state, client) = harness();

        let err = Executor::default()
            .run(&steps, state, client)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExecutionError::Graph(GraphError::CycleDetected { .. })
        ));
        assert!(err.step().is_none());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_stops_run_and_keeps_earlier_writes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            Step::new("writer", "Writer", |ctx| async move {
                ctx.job_state()
                    .add_entity(Entity::new("gitlab-user:1", "gitlab_user", "User", "1"))
                    .await?;
                Ok(())
            }),
            Step::new("broken", "Broken", |_ctx| async move {
                Err(StepError::failed("boom"))
            })
            .depends_on("writer"),
            recording("after", &log).depends_on("broken"),
        ];
        let (state, client) = harness();

        let err = Executor::default()
            .run(&steps, Arc::clone(&state), client)
            .await
            .unwrap_err();

        assert_eq!(err.step().map(StepId::as_str), Some("broken"));
        assert!(err.to_string().contains("boom"));
        assert_eq!(state.entity_count(), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_step_is_skipped_but_satisfies_dependents() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording("users", &log),
            recording("approvals", &log).depends_on("users"),
        ];
        let (state, client) = harness();
        let executor = Executor::new(ExecutorConfig::new().disable_step("users"));

        let summary = executor.run(&steps, state, client).await.unwrap();

        assert_eq!(log.lock().unwrap().clone(), ["approvals"]);
        assert_eq!(
            summary.outcome("users").map(|o| o.status),
            Some(StepStatus::Disabled)
        );
        assert_eq!(summary.order(), [&StepId::new("users"), &StepId::new("approvals")]);
    }

    #[tokio::test]
    async fn test_summary_tracks_written_and_undeclared_types() {
        let steps = vec![Step::new("users", "Users", |ctx| async move {
            ctx.job_state()
                .add_entities(vec![
                    Entity::new("gitlab-user:1", "gitlab_user", "User", "1"),
                    Entity::new("gitlab-group:1", "gitlab_group", "Group", "1"),
                ])
                .await?;
            Ok(())
        })
        .produces("gitlab_user")];
        let (state, client) = harness();

        let summary = Executor::default().run(&steps, state, client).await.unwrap();
        let outcome = summary.outcome("users").unwrap();

        assert_eq!(outcome.entities_added, 2);
        assert_eq!(outcome.encountered_types.len(), 2);
        assert_eq!(
            outcome.undeclared_types.iter().collect::<Vec<_>>(),
            ["gitlab_group"]
        );
        assert_eq!(summary.entities_added(), 2);
    }

    #[tokio::test]
    async fn test_context_carries_run_metadata() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_step = Arc::clone(&seen);
        let steps = vec![Step::new("inspect", "Inspect", move |ctx| {
            let seen = Arc::clone(&seen_in_step);
            async move {
                *seen.lock().unwrap() = Some((
                    ctx.step_id().clone(),
                    ctx.run_id(),
                    ctx.config().max_concurrent_requests(),
                ));
                Ok(())
            }
        })];
        let (state, client) = harness();
        let executor = Executor::new(ExecutorConfig::new().with_max_concurrent_requests(3));

        let summary = executor.run(&steps, state, client).await.unwrap();

        let (step_id, run_id, limit) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(step_id, "inspect");
        assert_eq!(run_id, summary.run_id);
        assert_eq!(limit, 3);
    }

    #[tokio::test]
    async fn test_empty_run() {
        let (state, client) = harness();
        let summary = Executor::default().run(&[], state, client).await.unwrap();
        assert!(summary.steps.is_empty());
    }
}
