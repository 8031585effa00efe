//! Sync report display models

use serde::Serialize;
use tabled::Tabled;

use super::common::truncate_string;
use crate::sync::{Outcome, OutcomeStatus, SyncReport};

/// Widest detail column before truncation
const DETAIL_WIDTH: usize = 60;

/// One line per resource with outcome counts.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ReportDisplay {
    #[tabled(rename = "RESOURCE")]
    pub resource: String,

    #[tabled(rename = "CREATED")]
    pub created: usize,

    #[tabled(rename = "UPDATED")]
    pub updated: usize,

    #[tabled(rename = "UNCHANGED")]
    pub unchanged: usize,

    #[tabled(rename = "SKIPPED")]
    pub skipped: usize,

    #[tabled(rename = "FAILED")]
    pub failed: usize,
}

impl From<&SyncReport> for ReportDisplay {
    fn from(report: &SyncReport) -> Self {
        Self {
            resource: report.resource.clone(),
            created: report.created,
            updated: report.updated,
            unchanged: report.unchanged,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

/// One line per entity.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct OutcomeDisplay {
    #[tabled(rename = "RESOURCE")]
    pub resource: String,

    #[tabled(rename = "KEY")]
    pub key: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "ACTION")]
    pub action: String,

    /// Changed fields, skip reason or error
    #[tabled(rename = "DETAIL")]
    pub detail: String,
}

/// Action label; dry runs report what would happen.
pub fn action_label(status: OutcomeStatus, dry_run: bool) -> &'static str {
    match (status, dry_run) {
        (OutcomeStatus::Created, false) => "created",
        (OutcomeStatus::Created, true) => "create",
        (OutcomeStatus::Updated, false) => "updated",
        (OutcomeStatus::Updated, true) => "update",
        (OutcomeStatus::Unchanged, _) => "unchanged",
        (OutcomeStatus::Skipped, _) => "skipped",
        (OutcomeStatus::Failed, _) => "failed",
    }
}

impl OutcomeDisplay {
    pub fn new(report: &SyncReport, outcome: &Outcome) -> Self {
        Self {
            resource: report.resource.clone(),
            key: outcome.key.clone(),
            name: outcome.label.clone(),
            action: action_label(outcome.status, report.dry_run).to_string(),
            detail: outcome
                .detail
                .as_deref()
                .map(|d| truncate_string(d, DETAIL_WIDTH))
                .unwrap_or_else(|| "--".to_string()),
        }
    }

    /// Rows for every entity across reports, optionally hiding no-ops.
    pub fn rows(reports: &[SyncReport], include_unchanged: bool) -> Vec<Self> {
        reports
            .iter()
            .flat_map(|report| {
                report
                    .outcomes
                    .iter()
                    .filter(move |o| include_unchanged || o.status != OutcomeStatus::Unchanged)
                    .map(move |o| Self::new(report, o))
            })
            .collect()
    }
}
