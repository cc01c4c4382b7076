//! Graph records produced by steps
//!
//! [`Entity`] is a node, [`Relationship`] a directed, classed edge between two
//! entity keys. Both serialize with the `_key`/`_type`/`_class` field names
//! used by graph interchange tooling.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named attribute values attached to an entity, ordered by name.
pub type Attributes = BTreeMap<String, Value>;

/// A graph node representing one resource instance.
///
/// # Example
///
/// ```
/// use jobgraph::core::Entity;
///
/// let user = Entity::new("gitlab-user:7", "gitlab_user", "User", "7")
///     .with_attribute("username", "octo");
/// assert_eq!(user.attribute("username").and_then(|v| v.as_str()), Some("octo"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_key")]
    key: String,
    #[serde(rename = "_type")]
    entity_type: String,
    #[serde(rename = "_class")]
    class: String,
    /// Opaque identifier of the resource in the remote system
    #[serde(rename = "sourceId")]
    source_id: String,
    #[serde(default)]
    attributes: Attributes,
}

impl Entity {
    pub fn new(
        key: impl Into<String>,
        entity_type: impl Into<String>,
        class: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            entity_type: entity_type.into(),
            class: class.into(),
            source_id: source_id.into(),
            attributes: Attributes::new(),
        }
    }

    /// Sets an attribute, replacing any previous value under `name`.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets an attribute only when `value` is present.
    pub fn with_optional_attribute<V: Into<Value>>(
        self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(v) => self.with_attribute(name, v),
            None => self,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// A directed, classed edge between two entities.
///
/// The key and type are derived from the endpoints so the same edge always
/// gets the same identity within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "_key")]
    key: String,
    #[serde(rename = "_type")]
    relationship_type: String,
    #[serde(rename = "_class")]
    class: String,
    #[serde(rename = "_fromEntityKey")]
    from_key: String,
    #[serde(rename = "_toEntityKey")]
    to_key: String,
}

impl Relationship {
    /// Creates a relationship between two entities, deriving key and type.
    ///
    /// # Example
    ///
    /// ```
    /// use jobgraph::core::{Entity, Relationship};
    ///
    /// let user = Entity::new("gitlab-user:7", "gitlab_user", "User", "7");
    /// let mr = Entity::new("proj:5:mr:3", "gitlab_merge_request", "PR", "3");
    /// let rel = Relationship::between("APPROVED", &user, &mr);
    ///
    /// assert_eq!(rel.relationship_type(), "gitlab_user_approved_merge_request");
    /// assert_eq!(rel.key(), "gitlab-user:7|approved|proj:5:mr:3");
    /// ```
    pub fn between(class: impl Into<String>, from: &Entity, to: &Entity) -> Self {
        let class = class.into();
        let relationship_type = relationship_type(&class, from.entity_type(), to.entity_type());
        Self::new(class, relationship_type, from.key(), to.key())
    }

    /// Creates a relationship from raw endpoint keys.
    pub fn new(
        class: impl Into<String>,
        relationship_type: impl Into<String>,
        from_key: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        let class = class.into();
        let from_key = from_key.into();
        let to_key = to_key.into();
        Self {
            key: relationship_key(&class, &from_key, &to_key),
            relationship_type: relationship_type.into(),
            class,
            from_key,
            to_key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn relationship_type(&self) -> &str {
        &self.relationship_type
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn from_key(&self) -> &str {
        &self.from_key
    }

    pub fn to_key(&self) -> &str {
        &self.to_key
    }
}

/// Delimiter inside relationship keys; never valid inside an endpoint key.
pub const RELATIONSHIP_KEY_DELIMITER: char = '|';

/// `"<from>|<class>|<to>"` with the class lowercased.
pub fn relationship_key(class: &str, from_key: &str, to_key: &str) -> String {
    format!(
        "{from_key}{d}{}{d}{to_key}",
        class.to_lowercase(),
        d = RELATIONSHIP_KEY_DELIMITER
    )
}

/// `"<from_type>_<class>_<to_type>"`, dropping the vendor prefix from
/// `to_type` when both types share it.
///
/// ```
/// use jobgraph::core::relationship_type;
///
/// assert_eq!(
///     relationship_type("HAS", "gitlab_project", "gitlab_merge_request"),
///     "gitlab_project_has_merge_request"
/// );
/// assert_eq!(relationship_type("USES", "gitlab_user", "aws_role"), "gitlab_user_uses_aws_role");
/// ```
pub fn relationship_type(class: &str, from_type: &str, to_type: &str) -> String {
    let class = class.to_lowercase();
    let to_type = from_type
        .split_once('_')
        .and_then(|(vendor, _)| to_type.strip_prefix(vendor))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(to_type);
    format!("{from_type}_{class}_{to_type}")
}
