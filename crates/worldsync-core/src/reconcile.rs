//! Membership reconciliation.
//!
//! For every role a world defines, compares the roster wanted by the batch with
//! the role subgroup's current roster and applies the difference: removals
//! first, then additions. A world whose processing fails is recorded in the
//! report and the remaining worlds still run.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::aggregate::{GroupCache, GroupCacheEntry};
use crate::error::SyncResult;
use crate::ids::{GroupId, RoleId, UserId};
use crate::report::RunReport;
use crate::store::{GroupStore, MemberVisibility};

/// Membership changes for one role subgroup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Current members not wanted any more, sorted.
    pub to_remove: Vec<UserId>,
    /// Wanted members not present yet, sorted.
    pub to_add: Vec<UserId>,
}

impl MembershipDiff {
    pub fn compute(current: &HashSet<UserId>, desired: &HashSet<UserId>) -> Self {
        let mut to_remove: Vec<UserId> = current.difference(desired).cloned().collect();
        let mut to_add: Vec<UserId> = desired.difference(current).cloned().collect();
        to_remove.sort();
        to_add.sort();
        Self { to_remove, to_add }
    }

    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// Applies aggregated rosters to the store.
pub struct MembershipReconciler<'a, S: GroupStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GroupStore + ?Sized> MembershipReconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reconcile every cached world, isolating failures per world.
    pub async fn reconcile_all(&self, cache: GroupCache, report: &mut RunReport) {
        info!(groups = cache.len(), "Reconciling world memberships");

        for (group_id, entry) in cache {
            if let Err(e) = self.reconcile_group(&group_id, &entry, report).await {
                warn!(
                    group_id = %group_id,
                    error = %e,
                    transient = e.is_transient(),
                    "Processing group failed"
                );
                report.record_exception(format!("Processing group had error: {e}"));
            }
        }
    }

    /// Reconcile every role the world defines.
    ///
    /// Roles no row mentioned are left untouched; roles rows mentioned that the
    /// world does not define are ignored.
    pub async fn reconcile_group(
        &self,
        group_id: &GroupId,
        entry: &GroupCacheEntry,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        for role in entry.properties.role_definitions(group_id)? {
            let Some(desired) = entry.desired(&role.id) else {
                continue;
            };
            self.reconcile_role(group_id, &role.id, desired, report)
                .await?;
        }
        Ok(())
    }

    async fn reconcile_role(
        &self,
        group_id: &GroupId,
        role: &RoleId,
        desired: &HashSet<UserId>,
        report: &mut RunReport,
    ) -> SyncResult<MembershipDiff> {
        let subgroup = group_id.role_subgroup(role);
        let current = self.store.get_role_subgroup_members(&subgroup).await?;
        let diff = MembershipDiff::compute(&current, desired);

        debug!(
            subgroup = %subgroup,
            current = current.len(),
            desired = desired.len(),
            removing = diff.to_remove.len(),
            adding = diff.to_add.len(),
            "Reconciling role subgroup"
        );

        for user in &diff.to_remove {
            self.store.remove_member(&subgroup, user).await?;
        }
        report.record_updated(diff.to_remove.len() as u32);

        for user in &diff.to_add {
            self.store
                .add_member(&subgroup, user, MemberVisibility::Viewer)
                .await?;
            report.record_created(1);
        }

        Ok(diff)
    }
}
