//! Diff command implementation
//!
//! A dry run of the sync pipeline, printed per entity instead of per
//! resource.

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat, progress};
use crate::config::TenantRole;
use crate::error::Result;
use crate::models::OutcomeDisplay;
use crate::output::Formattable;
use crate::output::json::format_json_between;
use crate::sync::{self, AssumeYes, Resource, SyncContext};

/// Run the diff command
pub async fn run(opts: &GlobalOptions, resource: Resource, all_rows: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let source = ctx.client(TenantRole::Source)?;
    let destination = ctx.client(TenantRole::Destination)?;
    let options = ctx.sync_options(true, false)?;

    let spinner = progress::spinner(format!("Comparing {}", resource), true);
    let sync_ctx = SyncContext::new(&source, &destination, options, &AssumeYes);
    let result = sync::run(resource, &sync_ctx).await;
    spinner.finish_and_clear();
    let summary = result?;

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            format_json_between(
                &summary.reports,
                ctx.config.source.domain.as_deref(),
                ctx.config.destination.domain.as_deref()
            )?
        ),
        OutputFormat::Table => {
            OutcomeDisplay::rows(&summary.reports, all_rows).print(ctx.format)?;
            let pending: usize = summary
                .reports
                .iter()
                .map(|r| r.created + r.updated)
                .sum();
            if pending == 0 && summary.failures.is_empty() {
                eprintln!("{} Destination is in sync", "✓".green());
            } else {
                eprintln!("{} {} change(s) pending", "○".dimmed(), pending);
            }
        }
    }

    for (resource, error) in &summary.failures {
        eprintln!("{} {}: {}", "✗".red(), resource, error);
    }
    sync::check_summary(&summary)
}
