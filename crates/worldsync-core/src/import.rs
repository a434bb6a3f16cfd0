//! End-to-end import runs.
//!
//! Each input category gets one entry point taking already-read rows and
//! returning the finished [`RunReport`]:
//!
//! - [`run_members`] aggregates the whole batch first and only then
//!   reconciles. A row that fails aggregation aborts the batch before any
//!   roster is touched, so a partial batch can never remove members.
//! - [`run_worlds`] handles rows one by one; a failing row is recorded and the
//!   next row proceeds.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::aggregate::RowAggregator;
use crate::config::{MembersConfig, WorldsConfig};
use crate::reconcile::MembershipReconciler;
use crate::report::RunReport;
use crate::row::{InputRow, MembershipRow, WorldRow};
use crate::store::GroupStore;
use crate::upsert::WorldUpserter;

/// Input category of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Members,
    Worlds,
}

impl ImportKind {
    /// File name the category is known by in configuration and reports.
    pub const fn source_name(self) -> &'static str {
        match self {
            ImportKind::Members => "members.csv",
            ImportKind::Worlds => "worlds.csv",
        }
    }
}

/// Drop the header row when configured and set aside rows that are too short.
fn usable_rows<I>(
    rows: I,
    skip_first_row: bool,
    expected_columns: usize,
    report: &mut RunReport,
) -> Vec<InputRow>
where
    I: IntoIterator<Item = InputRow>,
{
    rows.into_iter()
        .skip(usize::from(skip_first_row))
        .filter(|row| {
            if row.len() < expected_columns {
                report.record_skipped(format!(
                    "line {}: expected {expected_columns} columns, found {}",
                    row.line,
                    row.len()
                ));
                return false;
            }
            true
        })
        .collect()
}

/// Reconcile world rosters against a `members.csv` batch.
pub async fn run_members<S, I>(store: &S, config: &MembersConfig, rows: I) -> RunReport
where
    S: GroupStore + ?Sized,
    I: IntoIterator<Item = InputRow>,
{
    let mut report =
        RunReport::start(ImportKind::Members.source_name()).with_updated_label("removed");
    let rows = usable_rows(
        rows,
        config.skip_first_row,
        MembersConfig::EXPECTED_COLUMNS,
        &mut report,
    );

    info!(rows = rows.len(), "Aggregating membership rows");

    let mut aggregator = RowAggregator::new(store, &config.role_maps);
    for row in &rows {
        let result = match MembershipRow::parse(row) {
            Ok(parsed) => aggregator.aggregate(&parsed).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(line = row.line, error = %e, "Aggregation aborted");
            report.record_exception(format!("Aggregation aborted at line {}: {e}", row.line));
            report.finish();
            return report;
        }
    }

    let cache = aggregator.into_cache();
    MembershipReconciler::new(store)
        .reconcile_all(cache, &mut report)
        .await;

    report.finish();
    info!(
        added = report.created,
        removed = report.updated,
        skipped = report.skipped,
        exceptional = report.exceptional,
        "Membership import completed"
    );
    report
}

/// Create or update the worlds of a `worlds.csv` batch.
pub async fn run_worlds<S, I>(store: &S, config: &WorldsConfig, rows: I) -> RunReport
where
    S: GroupStore + ?Sized,
    I: IntoIterator<Item = InputRow>,
{
    let mut report = RunReport::start(ImportKind::Worlds.source_name());
    let rows = usable_rows(
        rows,
        config.skip_first_row,
        config.expected_columns(),
        &mut report,
    );

    info!(rows = rows.len(), "Processing world rows");

    let upserter = WorldUpserter::new(store, config);
    for row in &rows {
        let world = match WorldRow::parse(row, config) {
            Ok(world) => world,
            Err(e) => {
                warn!(line = row.line, error = %e, "Invalid world row");
                report.record_exception(format!("Processing row had error: {e}"));
                continue;
            }
        };

        if let Err(e) = upserter.upsert(&world, &mut report).await {
            warn!(
                group_id = %world.group,
                line = row.line,
                error = %e,
                transient = e.is_transient(),
                "Processing world failed"
            );
            report.record_exception(format!("Processing world {} had error: {e}", world.group));
        }
    }

    report.finish();
    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        exceptional = report.exceptional,
        "World import completed"
    );
    report
}
