//! GitLab integration steps.
//!
//! Each step fetches one kind of resource, shapes it into entities, and
//! links it to what earlier steps produced:
//!
//! ```text
//! fetch-accounts ──> fetch-projects ──> fetch-merge-requests ──┐
//!                                                              ├──> build-user-approved-merge-request-relationships
//! fetch-users ─────────────────────────────────────────────────┘
//! ```
//!
//! [`steps`] returns them in declaration order, ready for
//! [`crate::executor::Executor::run`].

use crate::core::{Entity, Relationship};
use crate::executor::{Step, StepError};
use crate::storage::JobState;
use chrono::DateTime;

mod accounts;
mod approvals;
mod merge_requests;
mod projects;
mod users;

pub use accounts::create_account_entity;
pub use approvals::create_user_approved_merge_request_relationship;
pub use merge_requests::{create_merge_request_entity, merge_request_key};
pub use projects::create_project_entity;
pub use users::create_user_entity;

pub const FETCH_ACCOUNTS: &str = "fetch-accounts";
pub const FETCH_USERS: &str = "fetch-users";
pub const FETCH_PROJECTS: &str = "fetch-projects";
pub const FETCH_MERGE_REQUESTS: &str = "fetch-merge-requests";
pub const BUILD_USER_APPROVED_MERGE_REQUEST_RELATIONSHIPS: &str =
    "build-user-approved-merge-request-relationships";

pub const ACCOUNT_TYPE: &str = "gitlab_account";
pub const USER_TYPE: &str = "gitlab_user";
pub const PROJECT_TYPE: &str = "gitlab_project";
pub const MERGE_REQUEST_TYPE: &str = "gitlab_merge_request";

pub const ACCOUNT_HAS_PROJECT_TYPE: &str = "gitlab_account_has_project";
pub const PROJECT_HAS_MERGE_REQUEST_TYPE: &str = "gitlab_project_has_merge_request";
pub const USER_APPROVED_MERGE_REQUEST_TYPE: &str = "gitlab_user_approved_merge_request";

pub const ACCOUNT_ID_PREFIX: &str = "gitlab-account";
pub const USER_ID_PREFIX: &str = "gitlab-user";
pub const PROJECT_ID_PREFIX: &str = "gitlab-project";
pub const MERGE_REQUEST_ID_PREFIX: &str = "gitlab-merge-request";

/// Job state data key holding the account entity's key.
pub const ACCOUNT_ENTITY_DATA_KEY: &str = "ACCOUNT_ENTITY_KEY";

/// Records written per `add_*` call.
const BATCH_SIZE: usize = 100;

/// All GitLab steps, in declaration order.
pub fn steps() -> Vec<Step> {
    vec![
        Step::new(FETCH_ACCOUNTS, "Fetch accounts", accounts::fetch_accounts)
            .produces(ACCOUNT_TYPE),
        Step::new(FETCH_USERS, "Fetch users", users::fetch_users).produces(USER_TYPE),
        Step::new(FETCH_PROJECTS, "Fetch projects", projects::fetch_projects)
            .produces(PROJECT_TYPE)
            .produces(ACCOUNT_HAS_PROJECT_TYPE)
            .depends_on(FETCH_ACCOUNTS),
        Step::new(
            FETCH_MERGE_REQUESTS,
            "Fetch merge requests",
            merge_requests::fetch_merge_requests,
        )
        .produces(MERGE_REQUEST_TYPE)
        .produces(PROJECT_HAS_MERGE_REQUEST_TYPE)
        .depends_on(FETCH_PROJECTS),
        Step::new(
            BUILD_USER_APPROVED_MERGE_REQUEST_RELATIONSHIPS,
            "Build user approved merge request relationships",
            approvals::build_user_approved_merge_request_relationships,
        )
        .produces(USER_APPROVED_MERGE_REQUEST_TYPE)
        .depends_on(FETCH_MERGE_REQUESTS)
        .depends_on(FETCH_USERS),
    ]
}

/// `createdOn` value for an RFC 3339 timestamp: epoch milliseconds.
///
/// Unparseable timestamps are dropped rather than failing the step.
pub fn created_on(timestamp: Option<&str>) -> Option<i64> {
    let timestamp = timestamp?;
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => Some(parsed.timestamp_millis()),
        Err(e) => {
            tracing::debug!(timestamp, error = %e, "ignoring unparseable timestamp");
            None
        }
    }
}

/// Buffers records and writes them in batches, entities before
/// relationships so edges never precede the nodes of the same batch.
struct GraphBatch {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
}

impl GraphBatch {
    fn new() -> Self {
        Self {
            entities: Vec::with_capacity(BATCH_SIZE),
            relationships: Vec::new(),
        }
    }

    async fn push_entity(&mut self, state: &dyn JobState, entity: Entity) -> Result<(), StepError> {
        self.entities.push(entity);
        if self.entities.len() >= BATCH_SIZE {
            self.flush(state).await?;
        }
        Ok(())
    }

    fn push_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    async fn flush(&mut self, state: &dyn JobState) -> Result<(), StepError> {
        if !self.entities.is_empty() {
            state.add_entities(std::mem::take(&mut self.entities)).await?;
        }
        if !self.relationships.is_empty() {
            state
                .add_relationships(std::mem::take(&mut self.relationships))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StepPlan;
    use crate::graph::StepId;

    #[test]
    fn test_created_on_parses_rfc3339() {
        assert_eq!(
            created_on(Some("2020-01-02T03:04:05.678Z")),
            Some(1_577_934_245_678)
        );
        assert_eq!(
            created_on(Some("2020-01-02T04:04:05+01:00")),
            Some(1_577_934_245_000)
        );
    }

    #[test]
    fn test_created_on_drops_missing_and_invalid() {
        assert_eq!(created_on(None), None);
        assert_eq!(created_on(Some("yesterday")), None);
    }

    #[test]
    fn test_steps_form_a_valid_plan() {
        let steps = steps();
        let plan = StepPlan::new(steps.iter().map(Step::descriptor)).unwrap();

        let order: Vec<&str> = plan.order().iter().map(StepId::as_str).collect();
        assert_eq!(
            order,
            [
                FETCH_ACCOUNTS,
                FETCH_USERS,
                FETCH_PROJECTS,
                FETCH_MERGE_REQUESTS,
                BUILD_USER_APPROVED_MERGE_REQUEST_RELATIONSHIPS
            ]
        );
    }

    #[test]
    fn test_approval_step_declaration() {
        let steps = steps();
        let approvals = steps
            .iter()
            .find(|s| s.id() == BUILD_USER_APPROVED_MERGE_REQUEST_RELATIONSHIPS)
            .unwrap();

        assert_eq!(
            approvals.descriptor().depends_on,
            [StepId::new(FETCH_MERGE_REQUESTS), StepId::new(FETCH_USERS)]
        );
        assert!(approvals
            .descriptor()
            .produced_types
            .contains(USER_APPROVED_MERGE_REQUEST_TYPE));
    }
}
