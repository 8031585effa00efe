//! Audit log report
//!
//! Queries `audit-logs` once per event type over a look-back window and
//! writes one sheet per event group.

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use log::info;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, progress};
use crate::client::{PageParams, TenantApi};
use crate::config::TenantRole;
use crate::error::{ConfigError, Result};
use crate::output::files::{FileFormat, Sheet, write_sheets};

pub const AUDIT_COLLECTION: &str = "audit-logs";

/// Largest page the audit endpoint accepts
const AUDIT_PAGE_SIZE: usize = 2000;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Window used with `--event-type` when `--days` is not given
pub const DEFAULT_DAYS: u32 = 30;

/// Longest look-back window `--days` accepts
pub const MAX_DAYS: u32 = 36_500;

const PROJECT_DAYS: u32 = 180;

const USER_WINDOWS: [u32; 5] = [7, 14, 30, 90, 180];

const PROJECT_EVENTS: &[&str] = &[
    "PROJECT_SETTINGS_SAVED",
    "PROJECTS_IMPORTED",
    "PROJECT_DIAGRAM_UPDATED",
    "PROJECT_UPDATED",
    "ISSUE_CREATED",
    "CONTROL_CREATED",
    "CONTROL_UPDATED",
    "CONTROL_APPLIED",
    "THREAT_CREATED",
    "THREAT_UPDATED",
    "THREAT_CONTROL_MITIGATION_UPDATED_MANUALLY",
    "THREAT_CONTROL_MITIGATION_UPDATED_AUTOMATICALLY",
];

const USER_EVENTS: &[&str] = &[
    "LOGIN_SUCCESS",
    "LOGIN_NO_USER",
    "LOGIN_WRONG_PASSWORD",
    "LOGIN_ACCOUNT_LOCKED",
    "LOGIN_ACCOUNT_DISABLED",
    "USER_LOGGEDOUT",
    "USER_LOGGED_OUT_BY_ADMIN",
    "USER_ENABLED",
    "USER_DISABLED",
];

/// Event types reported together on one sheet
#[derive(Debug, Clone, PartialEq)]
pub struct EventGroup {
    pub name: String,
    pub days: u32,
    pub event_types: Vec<String>,
}

impl EventGroup {
    pub fn new(name: impl Into<String>, days: u32, event_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            days,
            event_types: event_types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Project activity over six months, then user activity per window.
pub fn default_groups() -> Vec<EventGroup> {
    let mut groups = vec![EventGroup::new("Project Activity", PROJECT_DAYS, PROJECT_EVENTS)];
    groups.extend(
        USER_WINDOWS
            .iter()
            .map(|days| EventGroup::new(format!("User Activity {} days", days), *days, USER_EVENTS)),
    );
    groups
}

/// Groups for the given flags; no event types means the default report.
pub fn groups_for(days: Option<u32>, event_types: &[String]) -> Vec<EventGroup> {
    if event_types.is_empty() {
        return default_groups();
    }
    let days = days.unwrap_or(DEFAULT_DAYS);
    vec![EventGroup {
        name: format!("Audit Log {} days", days),
        days,
        event_types: event_types.to_vec(),
    }]
}

/// Filter expression for one event type between `start` and `end`.
pub fn audit_filter(start: DateTime<Utc>, end: DateTime<Utc>, event_type: &str) -> String {
    format!(
        "('timestamp'>='{}':AND:'timestamp'<='{}'):AND:'eventType'='{}'",
        start.format(TIMESTAMP_FORMAT),
        end.format(TIMESTAMP_FORMAT),
        event_type
    )
}

/// Fetch every event of a group into one sheet.
pub async fn fetch_group(api: &dyn TenantApi, group: &EventGroup, end: DateTime<Utc>) -> Result<Sheet> {
    let start = end
        .checked_sub_signed(Duration::days(i64::from(group.days)))
        .ok_or_else(|| ConfigError::Invalid(format!("look-back window of {} days is out of range", group.days)))?;
    let mut items = Vec::new();
    for event_type in &group.event_types {
        let params = PageParams::new(AUDIT_PAGE_SIZE).filter(audit_filter(start, end, event_type));
        let logs = api.get_all_filtered(AUDIT_COLLECTION, params).await?;
        info!(
            "Fetched {} '{}' event(s) from the last {} days",
            logs.len(),
            event_type,
            group.days
        );
        items.extend(logs);
    }
    Ok(Sheet::new(group.name.clone(), items))
}

/// Run the audit command
pub async fn run(
    opts: &GlobalOptions,
    days: Option<u32>,
    event_types: &[String],
    format: FileFormat,
    output: &str,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let client = ctx.client(TenantRole::Source)?;
    let dir = ctx.output_dir()?;
    let groups = groups_for(days, event_types);

    let spinner = progress::spinner("Fetching audit logs", false);
    let end = Utc::now();
    let mut sheets = Vec::with_capacity(groups.len());
    for group in &groups {
        spinner.set_message(format!("Fetching {}", group.name));
        match fetch_group(&client, group, end).await {
            Ok(sheet) => sheets.push(sheet),
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        }
    }
    spinner.finish_and_clear();

    for path in write_sheets(&dir, output, format, &sheets)? {
        println!("{} Wrote {}", "✓".green(), path.display().to_string().cyan());
    }
    Ok(())
}
