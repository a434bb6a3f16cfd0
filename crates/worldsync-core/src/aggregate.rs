//! Row aggregation.
//!
//! Folds membership rows into one [`GroupCacheEntry`] per world so that each
//! world is reconciled once per run no matter how many rows mention it. Only
//! reads hit the store here: one details fetch per distinct world.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::config::RoleMap;
use crate::error::{SyncError, SyncResult};
use crate::ids::{GroupId, RoleId, UserId};
use crate::row::MembershipRow;
use crate::store::{GroupProperties, GroupStore};

/// Desired roster of one world, built up across the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCacheEntry {
    /// World properties as read on first encounter.
    pub properties: GroupProperties,
    /// Canonical role -> users wanted in that role.
    pub roles: HashMap<RoleId, HashSet<UserId>>,
}

impl GroupCacheEntry {
    pub fn new(properties: GroupProperties) -> Self {
        Self {
            properties,
            roles: HashMap::new(),
        }
    }

    /// Users wanted in a role, if any row named it.
    pub fn desired(&self, role: &RoleId) -> Option<&HashSet<UserId>> {
        self.roles.get(role)
    }
}

/// World id -> aggregation record, owned by a single run.
pub type GroupCache = HashMap<GroupId, GroupCacheEntry>;

/// Builds the [`GroupCache`] for a membership batch.
pub struct RowAggregator<'a, S: GroupStore + ?Sized> {
    store: &'a S,
    role_map: &'a RoleMap,
    cache: GroupCache,
}

impl<'a, S: GroupStore + ?Sized> RowAggregator<'a, S> {
    pub fn new(store: &'a S, role_map: &'a RoleMap) -> Self {
        Self {
            store,
            role_map,
            cache: GroupCache::new(),
        }
    }

    /// Add one row to the cache.
    ///
    /// Fails when the world cannot be read, has no world type, or the row's
    /// role label has no mapping for that type. Callers are expected to abort
    /// the batch on error.
    pub async fn aggregate(&mut self, row: &MembershipRow) -> SyncResult<()> {
        if !self.cache.contains_key(&row.group) {
            let properties = self
                .store
                .get_group_details(&row.group)
                .await?
                .and_then(|details| details.properties)
                .ok_or_else(|| SyncError::WorldNotFound {
                    group_id: row.group.clone(),
                })?;
            debug!(group_id = %row.group, "Cached world details");
            self.cache
                .insert(row.group.clone(), GroupCacheEntry::new(properties));
        }

        let entry = self
            .cache
            .get_mut(&row.group)
            .ok_or_else(|| SyncError::WorldNotFound {
                group_id: row.group.clone(),
            })?;

        let world_type =
            entry
                .properties
                .world_type
                .as_deref()
                .ok_or_else(|| SyncError::MissingWorldType {
                    group_id: row.group.clone(),
                })?;

        let role = self
            .role_map
            .resolve(&row.group, world_type, &row.role_label)?;

        entry
            .roles
            .entry(role)
            .or_default()
            .insert(row.user.clone());
        Ok(())
    }

    /// Number of distinct worlds seen so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn into_cache(self) -> GroupCache {
        self.cache
    }
}
