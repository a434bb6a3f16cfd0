//! Group store abstraction.
//!
//! The engine only ever talks to the store through [`GroupStore`]. Calls are
//! issued one at a time and awaited before the next one starts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{StoreResult, SyncError, SyncResult};
use crate::ids::{GroupId, RoleId, UserId};

/// Group operations required by the reconciliation engine.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Fetch a group. `Ok(None)` when the group does not exist.
    async fn get_group_details(&self, group_id: &GroupId) -> StoreResult<Option<GroupDetails>>;

    /// Fetch the current members of a role subgroup.
    async fn get_role_subgroup_members(&self, subgroup_id: &GroupId)
        -> StoreResult<HashSet<UserId>>;

    /// Add a user to a role subgroup.
    async fn add_member(
        &self,
        subgroup_id: &GroupId,
        user_id: &UserId,
        visibility: MemberVisibility,
    ) -> StoreResult<()>;

    /// Remove a user from a role subgroup.
    async fn remove_member(&self, subgroup_id: &GroupId, user_id: &UserId) -> StoreResult<()>;

    /// Create a world together with its role subgroups.
    async fn create_group(&self, group_id: &GroupId, payload: &CreateGroupPayload)
        -> StoreResult<()>;

    /// Set properties on an existing group.
    async fn update_group_properties(
        &self,
        group_id: &GroupId,
        patch: &PropertyPatch,
    ) -> StoreResult<()>;
}

/// A group as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDetails {
    /// `None` while the group exists only as a bare principal.
    #[serde(default)]
    pub properties: Option<GroupProperties>,
}

impl GroupDetails {
    pub fn with_properties(properties: GroupProperties) -> Self {
        Self {
            properties: Some(properties),
        }
    }
}

/// Properties of a world group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupProperties {
    #[serde(rename = "sakai:world-type", default, skip_serializing_if = "Option::is_none")]
    pub world_type: Option<String>,

    /// JSON-encoded list of role descriptors, stored by the server as a string.
    #[serde(rename = "sakai:roles", default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<String>,

    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl GroupProperties {
    /// Decode the world's role definitions.
    pub fn role_definitions(&self, group_id: &GroupId) -> SyncResult<Vec<RoleDefinition>> {
        let raw = self.roles.as_deref().ok_or_else(|| SyncError::InvalidRoles {
            group_id: group_id.clone(),
            message: "no sakai:roles property".to_string(),
        })?;

        serde_json::from_str(raw).map_err(|e| SyncError::InvalidRoles {
            group_id: group_id.clone(),
            message: e.to_string(),
        })
    }

    /// Property value as a string, if it is one.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.other.get(name).and_then(serde_json::Value::as_str)
    }
}

/// One entry of a world's `sakai:roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Who can see a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Logged,
    Private,
}

/// Who can join a world without an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joinability {
    Yes,
    Withauth,
    No,
}

/// How a new member is registered on a role subgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberVisibility {
    /// Member that can also view the subgroup.
    Viewer,
    /// Plain member.
    Member,
}

/// Body of a world creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupPayload {
    pub id: GroupId,
    pub title: String,
    pub description: String,
    pub joinability: Joinability,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub world_template: String,
    #[serde(rename = "_charset_")]
    pub charset: String,
}

/// Properties written to a world on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPatch {
    pub term: String,
    pub contact_name: String,
    pub contact_email: String,
    pub grouping: String,
    /// Deployment-specific properties, in configuration order.
    pub custom: Vec<(String, String)>,
}

impl PropertyPatch {
    /// All properties as `(name, value)` pairs, known ones first.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = vec![
            ("term", self.term.as_str()),
            ("contactName", self.contact_name.as_str()),
            ("contactEmail", self.contact_email.as_str()),
            ("grouping", self.grouping.as_str()),
        ];
        pairs.extend(
            self.custom
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        );
        pairs
    }
}
