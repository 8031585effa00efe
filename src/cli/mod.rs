//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

use crate::config::TenantRole;
use crate::output::files::FileFormat;
use crate::sync::Resource;

pub mod args;
pub mod audit;
pub mod completions;
pub mod confirm;
pub mod context;
pub mod diff;
pub mod export;
pub mod init;
pub mod progress;
pub mod status;
pub mod sync;

pub use args::OutputFormat;
pub use context::CommandContext;

/// irsync - reconcile configuration between IriusRisk tenants
#[derive(Parser, Debug)]
#[command(name = "irsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "IRSYNC_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "IRSYNC_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "IRSYNC_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Page size for collection reads
    #[arg(long, global = true, env = "IRSYNC_PAGE_SIZE", hide_env = true)]
    pub page_size: Option<usize>,

    /// Directory for exports and reports (defaults to home)
    #[arg(long, global = true, env = "IRSYNC_OUTPUT_DIR", hide_env = true)]
    pub output_dir: Option<PathBuf>,

    /// Source tenant subdomain or base URL
    #[arg(long, global = true, env = "IRSYNC_SOURCE_DOMAIN", hide_env = true)]
    pub source_domain: Option<String>,

    /// Source tenant API token
    #[arg(long, global = true, env = "IRSYNC_SOURCE_TOKEN", hide_env = true)]
    pub source_token: Option<String>,

    /// Destination tenant subdomain or base URL
    #[arg(long, global = true, env = "IRSYNC_DEST_DOMAIN", hide_env = true)]
    pub dest_domain: Option<String>,

    /// Destination tenant API token
    #[arg(long, global = true, env = "IRSYNC_DEST_TOKEN", hide_env = true)]
    pub dest_token: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store tenant credentials in the config file
    Init,

    /// Show resolved configuration for both tenants
    Status,

    /// Copy configuration from the source tenant to the destination
    #[command(after_help = "EXAMPLES:\n  \
            irsync sync business-units             # One resource\n  \
            irsync sync all --dry-run              # Preview everything\n  \
            irsync sync all --yes                  # No confirmation prompts\n  \
            irsync sync roles --format json        # Machine-readable report")]
    Sync {
        /// Resource to reconcile, or `all` in dependency order
        #[arg(value_enum)]
        resource: Resource,

        /// Show what would change without writing
        #[arg(long, short = 'n')]
        dry_run: bool,

        /// Skip confirmation prompts
        #[arg(long, short = 'y')]
        yes: bool,

        /// Warn about duplicate keys instead of refusing the resource
        #[arg(long)]
        allow_duplicate_keys: bool,
    },

    /// Show planned changes for a resource without writing
    Diff {
        /// Resource to compare
        #[arg(value_enum)]
        resource: Resource,

        /// Include entities that are already in sync
        #[arg(long, short = 'a')]
        all_rows: bool,
    },

    /// Export a collection to a file
    #[command(after_help = "EXAMPLES:\n  \
            irsync export users                            # ~/users.xlsx\n  \
            irsync export business-units --file-format csv\n  \
            irsync export roles --tenant destination --output roles-prod")]
    Export {
        /// Collection path under /api/v2 (e.g. users, business-units)
        collection: String,

        /// Tenant to read from
        #[arg(long, value_enum, default_value = "source")]
        tenant: TenantArg,

        /// File format
        #[arg(long, short = 'F', value_enum, default_value = "xlsx")]
        file_format: FileFormat,

        /// File name without extension (defaults to the collection name)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },

    /// Build an audit log report from the source tenant
    #[command(after_help = "EXAMPLES:\n  \
            irsync audit                                   # Project and user activity workbook\n  \
            irsync audit --days 7 --event-type LOGIN_SUCCESS\n  \
            irsync audit --days 30 -e USER_ENABLED,USER_DISABLED --file-format csv")]
    Audit {
        /// Look-back window in days (requires --event-type)
        #[arg(long, requires = "event_type", value_parser = clap::value_parser!(u32).range(1..=audit::MAX_DAYS as i64))]
        days: Option<u32>,

        /// Event types to include, comma-separated or repeated
        #[arg(long, short = 'e', value_delimiter = ',')]
        event_type: Vec<String>,

        /// File format
        #[arg(long, short = 'F', value_enum, default_value = "xlsx")]
        file_format: FileFormat,

        /// File name without extension
        #[arg(long, short = 'o', default_value = "audit_log_report")]
        output: String,
    },

    /// Generate shell completions
    #[command(after_help = "\
Install:
  bash:   irsync completion bash > /etc/bash_completion.d/irsync
  zsh:    irsync completion zsh > \"${fpath[1]}/_irsync\"
  fish:   irsync completion fish > ~/.config/fish/completions/irsync.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Tenant selector for commands that read from one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TenantArg {
    Source,
    #[value(alias = "dest")]
    Destination,
}

impl From<TenantArg> for TenantRole {
    fn from(arg: TenantArg) -> Self {
        match arg {
            TenantArg::Source => TenantRole::Source,
            TenantArg::Destination => TenantRole::Destination,
        }
    }
}
