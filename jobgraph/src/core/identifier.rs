//! Entity identifiers
//!
//! Every entity key is built from one or two `<namespace>:<remoteId>` pairs:
//!
//! - [`Identifier`]: `"gitlab-user:7"`, a single resource
//! - [`CompositeIdentifier`]: `"gitlab-project:5:gitlab-merge-request:3"`, a
//!   resource addressed inside a parent scope
//!
//! The encoding is consumed by downstream graph tooling, so the format is
//! fixed: consumers split on the first `:`.

use super::error::{CoreError, Result};
use std::fmt;

/// Separator between namespace and id segments.
pub const DELIMITER: char = ':';

/// A `<namespace>:<remoteId>` identifier.
///
/// # Examples
///
/// ```
/// use jobgraph::core::Identifier;
///
/// let id = Identifier::parse("gitlab-account:42").unwrap();
/// assert_eq!(id.namespace(), "gitlab-account");
/// assert_eq!(id.id(), 42);
/// assert_eq!(id.to_string(), "gitlab-account:42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    namespace: String,
    id: u64,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, id: u64) -> Self {
        Self {
            namespace: namespace.into(),
            id,
        }
    }

    /// Parses `"<namespace>:<id>"`, splitting on the first delimiter.
    pub fn parse(key: &str) -> Result<Self> {
        let (namespace, id) = key
            .split_once(DELIMITER)
            .ok_or_else(|| CoreError::invalid_identifier(key, "missing ':' delimiter"))?;
        if namespace.is_empty() {
            return Err(CoreError::invalid_identifier(key, "empty namespace"));
        }
        Ok(Self::new(namespace, parse_id(key, id)?))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, DELIMITER, self.id)
    }
}

/// A resource identifier nested inside a parent scope:
/// `"<scopeNamespace>:<scopeId>:<resourceNamespace>:<resourceId>"`.
///
/// Merge requests are keyed this way because follow-up API calls need both
/// the owning project's id and the merge request's own id.
///
/// # Examples
///
/// ```
/// use jobgraph::core::CompositeIdentifier;
///
/// let key = CompositeIdentifier::parse("proj:5:mr:3").unwrap();
/// assert_eq!(key.scope_id(), 5);
/// assert_eq!(key.resource_id(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeIdentifier {
    scope: Identifier,
    resource: Identifier,
}

impl CompositeIdentifier {
    pub fn new(scope: Identifier, resource: Identifier) -> Self {
        Self { scope, resource }
    }

    /// Parses a four-segment composite key.
    ///
    /// Wrong segment counts, empty namespaces and non-numeric ids are errors.
    pub fn parse(key: &str) -> Result<Self> {
        let segments: Vec<&str> = key.split(DELIMITER).collect();
        let &[scope_ns, scope_id, resource_ns, resource_id] = segments.as_slice() else {
            return Err(CoreError::invalid_identifier(
                key,
                format!("expected 4 segments, found {}", segments.len()),
            ));
        };
        if scope_ns.is_empty() || resource_ns.is_empty() {
            return Err(CoreError::invalid_identifier(key, "empty namespace"));
        }

        Ok(Self {
            scope: Identifier::new(scope_ns, parse_id(key, scope_id)?),
            resource: Identifier::new(resource_ns, parse_id(key, resource_id)?),
        })
    }

    pub fn scope(&self) -> &Identifier {
        &self.scope
    }

    pub fn resource(&self) -> &Identifier {
        &self.resource
    }

    /// Numeric id of the parent scope (e.g. the project id).
    pub fn scope_id(&self) -> u64 {
        self.scope.id
    }

    /// Numeric id of the resource itself.
    pub fn resource_id(&self) -> u64 {
        self.resource.id
    }
}

impl fmt::Display for CompositeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.scope, DELIMITER, self.resource)
    }
}

/// Digits only, no sign and no leading zeros, so a parsed key displays back unchanged.
fn parse_id(key: &str, segment: &str) -> Result<u64> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if !canonical {
        return Err(CoreError::invalid_identifier(
            key,
            format!("'{segment}' is not a numeric id"),
        ));
    }
    segment
        .parse::<u64>()
        .map_err(|_| CoreError::invalid_identifier(key, format!("'{segment}' is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_splits_on_first_delimiter() {
        let id = Identifier::parse("gitlab-user:9").unwrap();
        assert_eq!(id.namespace(), "gitlab-user");
        assert_eq!(id.id(), 9);

        // Everything after the first ':' must be the id
        assert!(Identifier::parse("a:1:2").is_err());
    }

    #[test]
    fn test_identifier_rejects_malformed_keys() {
        assert!(Identifier::parse("gitlab-user").is_err());
        assert!(Identifier::parse(":7").is_err());
        assert!(Identifier::parse("gitlab-user:seven").is_err());
        assert!(Identifier::parse("gitlab-user:-7").is_err());
    }

    #[test]
    fn test_only_canonical_ids_parse() {
        assert!(Identifier::parse("gitlab-user:+7").is_err());
        assert!(Identifier::parse("gitlab-user:07").is_err());
        assert!(Identifier::parse("gitlab-user: 7").is_err());
        assert!(CompositeIdentifier::parse("gitlab-project:+5:gitlab-merge-request:3").is_err());

        for key in ["gitlab-user:0", "gitlab-user:7", "gitlab-user:120"] {
            assert_eq!(Identifier::parse(key).unwrap().to_string(), key);
        }
    }

    #[test]
    fn test_account_key_format() {
        assert_eq!(
            Identifier::new("gitlab-account", 1234).to_string(),
            "gitlab-account:1234"
        );
    }

    #[test]
    fn test_composite_roundtrip_with_display() {
        let key = CompositeIdentifier::new(
            Identifier::new("gitlab-project", 5),
            Identifier::new("gitlab-merge-request", 3),
        );
        assert_eq!(key.to_string(), "gitlab-project:5:gitlab-merge-request:3");
        assert_eq!(CompositeIdentifier::parse(&key.to_string()).unwrap(), key);
    }

    #[test]
    fn test_composite_rejects_wrong_segment_count() {
        let err = CompositeIdentifier::parse("proj:5:3").unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier { .. }));
        assert!(CompositeIdentifier::parse("proj:5:mr:3:extra").is_err());
        assert!(CompositeIdentifier::parse("").is_err());
    }

    #[test]
    fn test_composite_rejects_non_numeric_ids() {
        assert!(CompositeIdentifier::parse("proj:five:mr:3").is_err());
        assert!(CompositeIdentifier::parse("proj:5:mr:three").is_err());
    }
}
