//! Status command implementation

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::config::{Config, TenantRole};
use crate::error::Result;
use crate::models::TenantDisplay;
use crate::output::Formattable;

/// Run the status command to display configuration status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let config_path = Config::resolve_path(opts.config_ref())?;

    let ctx = match CommandContext::new(opts) {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            println!();
            println!(
                "Run {} to create a configuration file.",
                "irsync init".cyan()
            );
            return Ok(());
        }
    };

    let tenants = vec![
        TenantDisplay::new(&ctx.config, TenantRole::Source),
        TenantDisplay::new(&ctx.config, TenantRole::Destination),
    ];

    if ctx.format == OutputFormat::Json {
        return tenants.print(ctx.format);
    }

    println!("{}\n", "irsync Configuration Status".bold());
    if config_path.exists() {
        println!("Config file: {}", config_path.display().to_string().cyan());
    } else {
        println!(
            "Config file: {} {}",
            config_path.display().to_string().dimmed(),
            "(not found)".dimmed()
        );
    }
    println!();

    for role in [TenantRole::Source, TenantRole::Destination] {
        match ctx.config.tenant(role) {
            Ok(tenant) => println!("{} {} tenant: {}", "✓".green(), role, tenant.base_url),
            Err(e) => {
                println!("{} {} tenant not ready", "✗".red(), role);
                println!("  → {}", e);
            }
        }
    }
    println!();

    tenants.print(ctx.format)?;

    println!();
    match ctx.output_dir() {
        Ok(dir) => println!("{} Output directory: {}", "○".dimmed(), dir.display()),
        Err(e) => println!("{} Output directory: {}", "⚠".yellow(), e),
    }
    println!("{} Page size: {}", "○".dimmed(), ctx.page_size());

    Ok(())
}
