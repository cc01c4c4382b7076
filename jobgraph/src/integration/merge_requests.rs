use super::{created_on, GraphBatch, MERGE_REQUEST_ID_PREFIX, MERGE_REQUEST_TYPE, PROJECT_ID_PREFIX};
use crate::client::{GitlabMergeRequest, ResourceClientExt, ResourceKind};
use crate::core::{CompositeIdentifier, Entity, Identifier, Relationship};
use crate::executor::{StepContext, StepError};
use futures::TryStreamExt;

pub(super) async fn fetch_merge_requests(ctx: StepContext) -> Result<(), StepError> {
    let state = ctx.job_state().as_ref();
    let mut merge_requests = ctx
        .client()
        .fetch_all::<GitlabMergeRequest>(ResourceKind::MergeRequests);
    let mut batch = GraphBatch::new();

    while let Some(merge_request) = merge_requests.try_next().await? {
        let entity = create_merge_request_entity(&merge_request);
        let project_key = Identifier::new(PROJECT_ID_PREFIX, merge_request.project_id).to_string();

        match state.find_entity(&project_key) {
            Some(project) => {
                batch.push_relationship(Relationship::between("HAS", &project, &entity));
            }
            None => tracing::debug!(
                project = %project_key,
                merge_request = entity.key(),
                "merge request belongs to an unknown project"
            ),
        }
        batch.push_entity(state, entity).await?;
    }
    batch.flush(state).await
}

/// `gitlab-project:<projectId>:gitlab-merge-request:<iid>`.
///
/// The project-scoped `iid` is what the per-project API paths expect.
pub fn merge_request_key(project_id: u64, iid: u64) -> CompositeIdentifier {
    CompositeIdentifier::new(
        Identifier::new(PROJECT_ID_PREFIX, project_id),
        Identifier::new(MERGE_REQUEST_ID_PREFIX, iid),
    )
}

pub fn create_merge_request_entity(merge_request: &GitlabMergeRequest) -> Entity {
    let key = merge_request_key(merge_request.project_id, merge_request.iid);

    Entity::new(
        key.to_string(),
        MERGE_REQUEST_TYPE,
        "PR",
        merge_request.id.to_string(),
    )
    .with_attribute("id", key.resource().to_string())
    .with_attribute("projectId", key.scope().to_string())
    .with_attribute("name", merge_request.title.clone())
    .with_attribute("title", merge_request.title.clone())
    .with_attribute("state", merge_request.state.clone())
    .with_attribute("merged", merge_request.merged_at.is_some())
    .with_optional_attribute("source", merge_request.source_branch.clone())
    .with_optional_attribute("target", merge_request.target_branch.clone())
    .with_optional_attribute("webLink", merge_request.web_url.clone())
    .with_optional_attribute(
        "authorLogin",
        merge_request
            .author
            .as_ref()
            .and_then(|author| author.username.clone()),
    )
    .with_optional_attribute("createdOn", created_on(merge_request.created_at.as_deref()))
    .with_optional_attribute("mergedOn", created_on(merge_request.merged_at.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_merge_request_key_round_trips_through_parse() {
        let key = merge_request_key(5, 3).to_string();
        assert_eq!(key, "gitlab-project:5:gitlab-merge-request:3");

        let parsed = CompositeIdentifier::parse(&key).unwrap();
        assert_eq!((parsed.scope_id(), parsed.resource_id()), (5, 3));
    }

    #[test]
    fn test_merge_request_entity_shape() {
        let merge_request: GitlabMergeRequest = serde_json::from_value(json!({
            "id": 1003, "iid": 3, "project_id": 5, "title": "Fix login",
            "state": "merged", "merged_at": "2021-06-01T10:00:00Z",
            "author": { "id": 7, "username": "grace" }
        }))
        .unwrap();

        let entity = create_merge_request_entity(&merge_request);

        assert_eq!(entity.key(), "gitlab-project:5:gitlab-merge-request:3");
        assert_eq!(entity.class(), "PR");
        assert_eq!(entity.source_id(), "1003");
        assert_eq!(entity.attribute("merged"), Some(&Value::Bool(true)));
        assert_eq!(
            entity.attribute("projectId").and_then(Value::as_str),
            Some("gitlab-project:5")
        );
        assert_eq!(
            entity.attribute("authorLogin").and_then(Value::as_str),
            Some("grace")
        );
    }
}
