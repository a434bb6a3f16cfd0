//! Run report.
//!
//! Counters and exception messages for one import run, plus the plain-text
//! summary sent to operators at the end of the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

/// Outcome accumulator for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Subject line, e.g. `members.csv file processed: 2024-09-01 06:00:00 UTC`.
    pub subject: String,
    /// Label for the `updated` counter; membership runs count removals there.
    pub updated_label: String,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub exceptional: u32,
    pub exceptions: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Start a report for the input file `source` (e.g. `members.csv`).
    pub fn start(source: &str) -> Self {
        let started_at = Utc::now();
        Self {
            subject: format!(
                "{source} file processed: {}",
                started_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            updated_label: "updated".to_string(),
            created: 0,
            updated: 0,
            skipped: 0,
            exceptional: 0,
            exceptions: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn with_updated_label(mut self, label: &str) -> Self {
        self.updated_label = label.to_string();
        self
    }

    pub fn record_created(&mut self, count: u32) {
        self.created += count;
    }

    pub fn record_updated(&mut self, count: u32) {
        self.updated += count;
    }

    pub fn record_skipped(&mut self, reason: impl Into<String>) {
        self.skipped += 1;
        tracing::warn!(reason = %reason.into(), "Row skipped");
    }

    /// Count a failed unit of work and keep its message for the summary.
    pub fn record_exception(&mut self, message: impl Into<String>) {
        self.exceptional += 1;
        self.exceptions.push(message.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether every unit of work succeeded.
    pub fn is_clean(&self) -> bool {
        self.exceptional == 0
    }

    /// Plain-text summary: subject, counters, then exception messages.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.subject);
        let _ = writeln!(out);
        let _ = writeln!(out, "created: {}", self.created);
        let _ = writeln!(out, "{}: {}", self.updated_label, self.updated);
        let _ = writeln!(out, "skipped: {}", self.skipped);
        let _ = writeln!(out, "exceptional: {}", self.exceptional);
        if !self.exceptions.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "exceptions:");
            for message in &self.exceptions {
                let _ = writeln!(out, "{message}");
            }
        }
        out
    }
}
