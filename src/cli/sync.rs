//! Sync command implementation

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::confirm::TerminalConfirm;
use crate::cli::{CommandContext, OutputFormat, progress};
use crate::config::{Config, TenantRole};
use crate::error::Result;
use crate::models::ReportDisplay;
use crate::output::Formattable;
use crate::output::json::format_json_between;
use crate::sync::{self, AssumeYes, Confirm, Resource, RunSummary, SyncContext, SyncReport};

/// Flags of the sync command
#[derive(Debug, Clone, Copy)]
pub struct SyncArgs {
    pub resource: Resource,
    pub dry_run: bool,
    pub yes: bool,
    pub allow_duplicate_keys: bool,
}

/// Resource that failed before any item was processed
#[derive(Debug, Serialize)]
struct FailedResource {
    resource: String,
    error: String,
}

/// JSON body for `--format json`
#[derive(Debug, Serialize)]
struct SyncOutput<'a> {
    dry_run: bool,
    reports: &'a [SyncReport],
    failed_resources: Vec<FailedResource>,
}

/// Run the sync command
pub async fn run(opts: &GlobalOptions, args: SyncArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let source = ctx.client(TenantRole::Source)?;
    let destination = ctx.client(TenantRole::Destination)?;
    let options = ctx.sync_options(args.dry_run, args.allow_duplicate_keys)?;

    if args.dry_run {
        eprintln!("{}", "DRY RUN - no changes will be made".yellow().bold());
    }

    let spinner = progress::spinner(format!("Syncing {}", args.resource), args.dry_run);
    let terminal = TerminalConfirm::new().with_spinner(spinner.clone());
    let confirm: &dyn Confirm = if args.yes { &AssumeYes } else { &terminal };

    let sync_ctx = SyncContext::new(&source, &destination, options, confirm);
    let result = sync::run(args.resource, &sync_ctx).await;
    spinner.finish_and_clear();
    let summary = result?;

    print_summary(&summary, &ctx.config, ctx.format, args.dry_run)?;
    sync::check_summary(&summary)
}

fn print_summary(summary: &RunSummary, config: &Config, format: OutputFormat, dry_run: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = SyncOutput {
                dry_run,
                reports: &summary.reports,
                failed_resources: summary
                    .failures
                    .iter()
                    .map(|(resource, error)| FailedResource {
                        resource: resource.to_string(),
                        error: error.clone(),
                    })
                    .collect(),
            };
            println!(
                "{}",
                format_json_between(&output, config.source.domain.as_deref(), config.destination.domain.as_deref())?
            );
        }
        OutputFormat::Table => {
            let rows: Vec<ReportDisplay> = summary.reports.iter().map(ReportDisplay::from).collect();
            rows.print(format)?;

            for (resource, error) in &summary.failures {
                eprintln!("{} {}: {}", "✗".red(), resource, error);
            }
            if summary.is_clean() {
                let verb = if dry_run { "Dry run complete" } else { "Sync complete" };
                eprintln!("{} {}", "✓".green(), verb);
            } else if summary.failed_items() > 0 {
                eprintln!(
                    "{} {} item(s) failed; see the log above for details",
                    "⚠".yellow(),
                    summary.failed_items()
                );
            }
        }
    }
    Ok(())
}
