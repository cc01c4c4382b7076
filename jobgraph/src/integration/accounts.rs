use super::{created_on, ACCOUNT_ENTITY_DATA_KEY, ACCOUNT_ID_PREFIX, ACCOUNT_TYPE};
use crate::client::{GitlabUser, ResourceClientExt};
use crate::core::{Entity, Identifier};
use crate::executor::{StepContext, StepError};
use serde_json::Value;

pub(super) async fn fetch_accounts(ctx: StepContext) -> Result<(), StepError> {
    let account = ctx.client().account().await?;
    let entity = create_account_entity(&account);
    let key = entity.key().to_string();

    ctx.job_state().add_entity(entity).await?;
    ctx.job_state()
        .set_data(ACCOUNT_ENTITY_DATA_KEY, Value::String(key))
        .await?;

    tracing::debug!(account_id = account.id, "account recorded");
    Ok(())
}

/// The authenticated user as the account entity.
pub fn create_account_entity(user: &GitlabUser) -> Entity {
    let id = Identifier::new(ACCOUNT_ID_PREFIX, user.id).to_string();

    Entity::new(id.clone(), ACCOUNT_TYPE, "User", user.id.to_string())
        .with_attribute("id", id)
        .with_attribute("name", user.name.clone())
        .with_attribute("username", user.username.clone())
        .with_optional_attribute("webLink", user.web_url.clone())
        .with_optional_attribute("createdOn", created_on(user.created_at.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_entity_shape() {
        let user: GitlabUser = serde_json::from_value(serde_json::json!({
            "id": 42, "name": "Ada", "username": "ada",
            "created_at": "2020-01-02T03:04:05.678Z"
        }))
        .unwrap();

        let entity = create_account_entity(&user);

        assert_eq!(entity.key(), "gitlab-account:42");
        assert_eq!(entity.entity_type(), "gitlab_account");
        assert_eq!(entity.class(), "User");
        assert_eq!(entity.source_id(), "42");
        assert_eq!(
            entity.attribute("createdOn").and_then(Value::as_i64),
            Some(1_577_934_245_678)
        );
        assert!(entity.attribute("webLink").is_none());
    }
}
