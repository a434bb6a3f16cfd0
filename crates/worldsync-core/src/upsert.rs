//! World create-or-update.
//!
//! A world row either creates the world (when the store has no properties for
//! it) or counts as an update. Either way the row's properties are written
//! afterwards, so repeated runs keep the store in sync with the input.

use tracing::{debug, info};

use crate::config::WorldsConfig;
use crate::error::{SyncError, SyncResult};
use crate::report::RunReport;
use crate::row::WorldRow;
use crate::store::{
    CreateGroupPayload, GroupDetails, GroupProperties, GroupStore, Joinability, PropertyPatch,
    Visibility,
};

/// Creates or updates worlds from `worlds.csv` rows.
pub struct WorldUpserter<'a, S: GroupStore + ?Sized> {
    store: &'a S,
    config: &'a WorldsConfig,
}

impl<'a, S: GroupStore + ?Sized> WorldUpserter<'a, S> {
    pub fn new(store: &'a S, config: &'a WorldsConfig) -> Self {
        Self { store, config }
    }

    /// Ensure the world exists and carries the row's properties.
    ///
    /// Returns the world's properties as read before the patch was applied.
    pub async fn upsert(&self, row: &WorldRow, report: &mut RunReport) -> SyncResult<GroupProperties> {
        let properties = self
            .create_or_load(row, report)
            .await?
            .and_then(|details| details.properties)
            .ok_or_else(|| SyncError::WorldNotCreated {
                group_id: row.group.clone(),
            })?;

        let patch = self.property_patch(row);
        self.store
            .update_group_properties(&row.group, &patch)
            .await?;
        debug!(group_id = %row.group, properties = patch.pairs().len(), "World properties updated");

        Ok(properties)
    }

    async fn create_or_load(
        &self,
        row: &WorldRow,
        report: &mut RunReport,
    ) -> SyncResult<Option<GroupDetails>> {
        let details = self.store.get_group_details(&row.group).await?;
        if details
            .as_ref()
            .is_some_and(|details| details.properties.is_some())
        {
            report.record_updated(1);
            return Ok(details);
        }

        let payload = self.creation_payload(row)?;
        self.store.create_group(&row.group, &payload).await?;
        report.record_created(1);
        info!(
            group_id = %row.group,
            template = %payload.world_template,
            visibility = ?payload.visibility,
            "World created"
        );

        // Creation does not hand back the final properties; read them again.
        Ok(self.store.get_group_details(&row.group).await?)
    }

    /// Build the creation request for a world that does not exist yet.
    pub fn creation_payload(&self, row: &WorldRow) -> SyncResult<CreateGroupPayload> {
        let code = row.template_code.as_deref().unwrap_or_default();
        let world_template = self.config.template_for(&row.group, code)?.to_string();

        let visibility = if row.is_published() {
            Visibility::Public
        } else {
            Visibility::Private
        };

        Ok(CreateGroupPayload {
            id: row.group.clone(),
            title: row.title.clone().unwrap_or_default(),
            description: row.description.clone().unwrap_or_default(),
            joinability: Joinability::No,
            visibility,
            tags: Vec::new(),
            world_template,
            charset: "utf-8".to_string(),
        })
    }

    /// Properties written on every run. Absent columns are written empty.
    pub fn property_patch(&self, row: &WorldRow) -> PropertyPatch {
        let grouping = row
            .grouping
            .clone()
            .or_else(|| self.config.global_grouping.clone())
            .unwrap_or_default();

        PropertyPatch {
            term: row.term.clone().unwrap_or_default(),
            contact_name: row.contact_name.clone().unwrap_or_default(),
            contact_email: row.contact_email.clone().unwrap_or_default(),
            grouping,
            custom: row
                .custom
                .iter()
                .map(|(name, value)| (name.clone(), value.clone().unwrap_or_default()))
                .collect(),
        }
    }
}
