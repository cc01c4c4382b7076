use super::{created_on, GraphBatch, ACCOUNT_ENTITY_DATA_KEY, PROJECT_ID_PREFIX, PROJECT_TYPE};
use crate::client::{GitlabProject, ResourceClientExt, ResourceKind};
use crate::core::{Entity, Identifier, Relationship};
use crate::executor::{StepContext, StepError};
use futures::TryStreamExt;

pub(super) async fn fetch_projects(ctx: StepContext) -> Result<(), StepError> {
    let state = ctx.job_state().as_ref();
    let account = state
        .get_data(ACCOUNT_ENTITY_DATA_KEY)
        .and_then(|key| key.as_str().and_then(|key| state.find_entity(key)));
    if account.is_none() {
        tracing::debug!("no account entity, projects will not be linked to an account");
    }

    let mut projects = ctx
        .client()
        .fetch_all::<GitlabProject>(ResourceKind::Projects);
    let mut batch = GraphBatch::new();

    while let Some(project) = projects.try_next().await? {
        let entity = create_project_entity(&project);
        if let Some(account) = &account {
            batch.push_relationship(Relationship::between("HAS", account, &entity));
        }
        batch.push_entity(state, entity).await?;
    }
    batch.flush(state).await
}

pub fn create_project_entity(project: &GitlabProject) -> Entity {
    let id = Identifier::new(PROJECT_ID_PREFIX, project.id).to_string();
    let visibility = project.visibility.as_deref();

    Entity::new(id.clone(), PROJECT_TYPE, "CodeRepo", project.id.to_string())
        .with_attribute("id", id)
        .with_attribute("name", project.name.clone())
        .with_attribute("public", visibility == Some("public"))
        .with_optional_attribute("fullName", project.path_with_namespace.clone())
        .with_optional_attribute("description", project.description.clone())
        .with_optional_attribute("visibility", project.visibility.clone())
        .with_optional_attribute("webLink", project.web_url.clone())
        .with_optional_attribute("createdOn", created_on(project.created_at.as_deref()))
}
