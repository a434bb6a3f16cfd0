//! In-memory group store.
//!
//! Keeps worlds and role subgroup rosters in process memory and records every
//! call it receives, so runs can be asserted on and replayed. Groups can be
//! marked as failing to exercise error isolation.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::ids::{GroupId, UserId};
use crate::store::{
    CreateGroupPayload, GroupDetails, GroupProperties, GroupStore, MemberVisibility,
    PropertyPatch, RoleDefinition,
};

/// A call received by [`InMemoryGroupStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetGroupDetails(GroupId),
    GetMembers(GroupId),
    AddMember(GroupId, UserId),
    RemoveMember(GroupId, UserId),
    CreateGroup(GroupId),
    UpdateProperties(GroupId),
}

impl StoreCall {
    /// Whether the call changes store state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::GetGroupDetails(_) | StoreCall::GetMembers(_))
    }

    fn target(&self) -> &GroupId {
        match self {
            StoreCall::GetGroupDetails(id)
            | StoreCall::GetMembers(id)
            | StoreCall::AddMember(id, _)
            | StoreCall::RemoveMember(id, _)
            | StoreCall::CreateGroup(id)
            | StoreCall::UpdateProperties(id) => id,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    groups: HashMap<GroupId, GroupDetails>,
    members: HashMap<GroupId, HashSet<UserId>>,
    failing: HashSet<GroupId>,
    calls: Vec<StoreCall>,
    create_without_properties: bool,
}

impl State {
    fn record(&mut self, call: StoreCall) -> StoreResult<()> {
        let failing = self.failing.contains(call.target());
        let target = call.target().clone();
        self.calls.push(call);
        if failing {
            return Err(StoreError::failed(format!("injected failure for {target}")));
        }
        Ok(())
    }
}

/// [`GroupStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryGroupStore {
    state: RwLock<State>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a world of the given type with the given role ids.
    #[must_use]
    pub fn with_world(mut self, group_id: &str, world_type: &str, roles: &[&str]) -> Self {
        let definitions: Vec<RoleDefinition> = roles
            .iter()
            .map(|id| RoleDefinition {
                id: (*id).into(),
                title: None,
            })
            .collect();
        let properties = GroupProperties {
            world_type: Some(world_type.to_string()),
            roles: serde_json::to_string(&definitions).ok(),
            ..Default::default()
        };
        self.state
            .get_mut()
            .groups
            .insert(group_id.into(), GroupDetails::with_properties(properties));
        self
    }

    /// Seed a group with arbitrary details.
    #[must_use]
    pub fn with_group(mut self, group_id: &str, details: GroupDetails) -> Self {
        self.state.get_mut().groups.insert(group_id.into(), details);
        self
    }

    /// Seed the roster of a role subgroup.
    #[must_use]
    pub fn with_members(mut self, subgroup_id: &str, users: &[&str]) -> Self {
        self.state.get_mut().members.insert(
            subgroup_id.into(),
            users.iter().map(|u| UserId::from(*u)).collect(),
        );
        self
    }

    /// Make every call addressing `group_id` fail.
    #[must_use]
    pub fn failing_on(mut self, group_id: &str) -> Self {
        self.state.get_mut().failing.insert(group_id.into());
        self
    }

    /// Accept creation requests without ever giving the world properties.
    #[must_use]
    pub fn creating_without_properties(mut self) -> Self {
        self.state.get_mut().create_without_properties = true;
        self
    }

    /// Current roster of a role subgroup.
    pub async fn members(&self, subgroup_id: &str) -> HashSet<UserId> {
        self.state
            .read()
            .await
            .members
            .get(subgroup_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current details of a group.
    pub async fn details(&self, group_id: &str) -> Option<GroupDetails> {
        self.state.read().await.groups.get(group_id).cloned()
    }

    /// Calls received so far.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.read().await.calls.clone()
    }

    /// Number of state-changing calls received so far.
    pub async fn mutation_count(&self) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .count()
    }

    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn get_group_details(&self, group_id: &GroupId) -> StoreResult<Option<GroupDetails>> {
        let mut state = self.state.write().await;
        state.record(StoreCall::GetGroupDetails(group_id.clone()))?;
        Ok(state.groups.get(group_id).cloned())
    }

    async fn get_role_subgroup_members(
        &self,
        subgroup_id: &GroupId,
    ) -> StoreResult<HashSet<UserId>> {
        let mut state = self.state.write().await;
        state.record(StoreCall::GetMembers(subgroup_id.clone()))?;
        Ok(state.members.get(subgroup_id).cloned().unwrap_or_default())
    }

    async fn add_member(
        &self,
        subgroup_id: &GroupId,
        user_id: &UserId,
        _visibility: MemberVisibility,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.record(StoreCall::AddMember(subgroup_id.clone(), user_id.clone()))?;
        state
            .members
            .entry(subgroup_id.clone())
            .or_default()
            .insert(user_id.clone());
        Ok(())
    }

    async fn remove_member(&self, subgroup_id: &GroupId, user_id: &UserId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.record(StoreCall::RemoveMember(subgroup_id.clone(), user_id.clone()))?;
        if let Some(members) = state.members.get_mut(subgroup_id) {
            members.remove(user_id);
        }
        Ok(())
    }

    async fn create_group(
        &self,
        group_id: &GroupId,
        payload: &CreateGroupPayload,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.record(StoreCall::CreateGroup(group_id.clone()))?;

        let details = if state.create_without_properties {
            GroupDetails::default()
        } else {
            let mut properties = GroupProperties::default();
            for (name, value) in [
                ("sakai:group-title", &payload.title),
                ("sakai:group-description", &payload.description),
                ("sakai:world-template", &payload.world_template),
            ] {
                properties
                    .other
                    .insert(name.to_string(), serde_json::Value::from(value.as_str()));
            }
            if let Ok(visibility) = serde_json::to_value(payload.visibility) {
                properties
                    .other
                    .insert("sakai:group-visible".to_string(), visibility);
            }
            GroupDetails::with_properties(properties)
        };
        state.groups.insert(group_id.clone(), details);
        Ok(())
    }

    async fn update_group_properties(
        &self,
        group_id: &GroupId,
        patch: &PropertyPatch,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.record(StoreCall::UpdateProperties(group_id.clone()))?;

        let properties = state
            .groups
            .get_mut(group_id)
            .and_then(|details| details.properties.as_mut())
            .ok_or_else(|| StoreError::GroupNotFound {
                group_id: group_id.clone(),
            })?;
        for (name, value) in patch.pairs() {
            properties
                .other
                .insert(name.to_string(), serde_json::Value::from(value));
        }
        Ok(())
    }
}
