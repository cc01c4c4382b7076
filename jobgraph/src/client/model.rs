//! Typed payloads returned by the GitLab API.
//!
//! Only the fields the integration steps read are declared; everything else
//! in the raw records is ignored.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitlabUser {
    pub id: u64,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitlabProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitlabMergeRequest {
    /// Instance-wide id
    pub id: u64,
    /// Project-scoped id, used in per-project API paths
    pub iid: u64,
    pub project_id: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub target_branch: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub author: Option<UserRef>,
}

/// Approval state of a single merge request.
///
/// GitLab sends `null` for empty approver lists and for approvers whose
/// account was removed; both decode to "nothing to link".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeRequestApprovals {
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved_by: Vec<Approver>,
}

impl MergeRequestApprovals {
    /// Remote ids of the approving users, first occurrence order, without repeats.
    pub fn approver_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = Vec::with_capacity(self.approved_by.len());
        for user in self.approved_by.iter().filter_map(|approver| approver.user.as_ref()) {
            if !ids.contains(&user.id) {
                ids.push(user.id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approver {
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// A user as embedded in other records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_approvals_tolerate_missing_fields() {
        let approvals: MergeRequestApprovals = serde_json::from_value(json!({})).unwrap();
        assert!(!approvals.approved);
        assert!(approvals.approved_by.is_empty());
    }

    #[test]
    fn test_approvals_tolerate_nulls() {
        let approvals: MergeRequestApprovals =
            serde_json::from_value(json!({ "approved": null, "approved_by": null })).unwrap();
        assert!(!approvals.approved);
        assert!(approvals.approved_by.is_empty());

        let approvals: MergeRequestApprovals = serde_json::from_value(json!({
            "approved": true,
            "approved_by": [{ "user": null }, {}, { "user": { "id": 7 } }]
        }))
        .unwrap();
        assert_eq!(approvals.approver_ids(), [7]);
    }

    #[test]
    fn test_approver_ids_deduplicate() {
        let approvals: MergeRequestApprovals = serde_json::from_value(json!({
            "approved": true,
            "approved_by": [
                { "user": { "id": 9, "username": "b" } },
                { "user": { "id": 7 } },
                { "user": { "id": 9 } }
            ]
        }))
        .unwrap();

        assert_eq!(approvals.approver_ids(), [9, 7]);
    }

    #[test]
    fn test_merge_request_ignores_unknown_fields() {
        let mr: GitlabMergeRequest = serde_json::from_value(json!({
            "id": 101, "iid": 3, "project_id": 5, "title": "Fix", "state": "opened",
            "labels": ["bug"], "draft": false
        }))
        .unwrap();

        assert_eq!(mr.iid, 3);
        assert!(mr.author.is_none());
    }
}
