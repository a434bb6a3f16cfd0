//! # worldsync core
//!
//! Drives a remote group store toward the desired state described by
//! `members.csv` and `worlds.csv` batches.
//!
//! Two workflows share this crate:
//!
//! - **Memberships** - [`RowAggregator`] folds `(user, world, role)` rows into a
//!   per-world [`GroupCache`], then [`MembershipReconciler`] diffs each role
//!   against the store's role subgroup and issues add/remove calls.
//! - **Worlds** - [`WorldUpserter`] creates a world when it is absent and
//!   always re-applies its properties.
//!
//! Both report outcomes into a [`RunReport`]. The store itself is abstract:
//! anything implementing [`GroupStore`] can be driven, including the
//! [`InMemoryGroupStore`] used by tests.
//!
//! ## Crate Organization
//!
//! - [`ids`] - Identifier newtypes (`GroupId`, `UserId`, `RoleId`)
//! - [`error`] - Engine and store error types
//! - [`config`] - Import configuration (role maps, templates, custom properties)
//! - [`row`] - Positional input rows and their typed views
//! - [`store`] - The `GroupStore` trait and its payload types
//! - [`memory`] - In-memory `GroupStore`
//! - [`aggregate`] - Row aggregation into the group cache
//! - [`reconcile`] - Membership diffing
//! - [`upsert`] - World create-or-update
//! - [`report`] - Run counters and summary rendering
//! - [`import`] - End-to-end runs for each input category

pub mod aggregate;
pub mod config;
pub mod error;
pub mod ids;
pub mod import;
pub mod memory;
pub mod reconcile;
pub mod report;
pub mod row;
pub mod store;
pub mod upsert;

pub use aggregate::{GroupCache, GroupCacheEntry, RowAggregator};
pub use config::{ImportConfig, MembersConfig, RoleMap, ServerConfig, WorldsConfig};
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use ids::{GroupId, RoleId, UserId};
pub use import::{run_members, run_worlds, ImportKind};
pub use memory::{InMemoryGroupStore, StoreCall};
pub use reconcile::{MembershipDiff, MembershipReconciler};
pub use report::RunReport;
pub use row::{InputRow, MembershipRow, WorldRow};
pub use store::{
    CreateGroupPayload, GroupDetails, GroupProperties, GroupStore, Joinability, MemberVisibility,
    PropertyPatch, RoleDefinition, Visibility,
};
pub use upsert::WorldUpserter;
