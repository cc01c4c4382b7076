//! Links users to the merge requests they approved.
//!
//! Approvals are not part of the merge request listing, so this step asks
//! the API once per merge request. Those calls run concurrently up to
//! [`crate::executor::ExecutorConfig::max_concurrent_requests`]; every
//! finished call commits its relationships before the step reports the
//! first failure.

use super::{MERGE_REQUEST_TYPE, USER_TYPE};
use crate::client::{ResourceClient, ResourceClientExt};
use crate::core::{CompositeIdentifier, Entity, Identifier, Relationship};
use crate::executor::{StepContext, StepError};
use crate::storage::JobState;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;

pub(super) async fn build_user_approved_merge_request_relationships(
    ctx: StepContext,
) -> Result<(), StepError> {
    let state = ctx.job_state().as_ref();
    let client = ctx.client().as_ref();
    let users = index_users(state);

    let results: Vec<Result<usize, StepError>> = stream::iter(state.iter_entities(MERGE_REQUEST_TYPE))
        .map(|merge_request| relate_approvers(client, state, &users, merge_request))
        .buffer_unordered(ctx.config().max_concurrent_requests())
        .collect()
        .await;

    let mut relationships = 0;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(count) => relationships += count,
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => tracing::debug!(error = %e, "additional approval failure"),
        }
    }

    tracing::info!(
        users = users.len(),
        relationships,
        "approval relationships built"
    );
    first_error.map_or(Ok(()), Err)
}

/// Remote user id to user entity, built once per run of the step.
fn index_users(state: &dyn JobState) -> HashMap<u64, Arc<Entity>> {
    state
        .iter_entities(USER_TYPE)
        .filter_map(|user| match Identifier::parse(user.key()) {
            Ok(id) => Some((id.id(), user)),
            Err(e) => {
                tracing::debug!(error = %e, "user entity without a numeric id, not indexed");
                None
            }
        })
        .collect()
}

async fn relate_approvers(
    client: &dyn ResourceClient,
    state: &dyn JobState,
    users: &HashMap<u64, Arc<Entity>>,
    merge_request: Arc<Entity>,
) -> Result<usize, StepError> {
    let key = CompositeIdentifier::parse(merge_request.key())?;

    let approvals = client
        .fetch_merge_request_approvals(key.scope_id(), key.resource_id())
        .await?;
    let Some(approvals) = approvals.filter(|a| a.approved) else {
        return Ok(0);
    };

    let relationships: Vec<Relationship> = approvals
        .approver_ids()
        .into_iter()
        .filter_map(|user_id| match users.get(&user_id) {
            Some(user) => Some(create_user_approved_merge_request_relationship(
                user,
                &merge_request,
            )),
            None => {
                tracing::debug!(
                    user_id,
                    merge_request = merge_request.key(),
                    "approver is not a known user, skipping"
                );
                None
            }
        })
        .collect();

    let count = relationships.len();
    state.add_relationships(relationships).await?;
    Ok(count)
}

pub fn create_user_approved_merge_request_relationship(
    user: &Entity,
    merge_request: &Entity,
) -> Relationship {
    Relationship::between("APPROVED", user, merge_request)
}
