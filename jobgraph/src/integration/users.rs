use super::{created_on, GraphBatch, USER_ID_PREFIX, USER_TYPE};
use crate::client::{GitlabUser, ResourceClientExt, ResourceKind};
use crate::core::{Entity, Identifier};
use crate::executor::{StepContext, StepError};
use futures::TryStreamExt;

pub(super) async fn fetch_users(ctx: StepContext) -> Result<(), StepError> {
    let state = ctx.job_state().as_ref();
    let mut users = ctx.client().fetch_all::<GitlabUser>(ResourceKind::Users);
    let mut batch = GraphBatch::new();

    while let Some(user) = users.try_next().await? {
        batch.push_entity(state, create_user_entity(&user)).await?;
    }
    batch.flush(state).await
}

pub fn create_user_entity(user: &GitlabUser) -> Entity {
    let id = Identifier::new(USER_ID_PREFIX, user.id).to_string();

    Entity::new(id.clone(), USER_TYPE, "User", user.id.to_string())
        .with_attribute("id", id)
        .with_attribute("name", user.name.clone())
        .with_attribute("username", user.username.clone())
        .with_attribute("active", user.state.as_deref() == Some("active"))
        .with_optional_attribute("state", user.state.clone())
        .with_optional_attribute("email", user.email.clone())
        .with_optional_attribute("admin", user.is_admin)
        .with_optional_attribute("webLink", user.web_url.clone())
        .with_optional_attribute("createdOn", created_on(user.created_at.as_deref()))
}
