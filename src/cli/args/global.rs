//! Global CLI options shared across all commands
//!
//! Collects the global flags once in `main.rs` so handlers take a single
//! argument instead of a dozen.

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::{TenantConfig, TenantRole};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// These values are the flag/environment layer. They override the config
/// file, which overrides `.env`, which overrides the legacy credential files.
/// The layering itself happens in `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Console output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.irsync/config.yaml)
    pub config: Option<String>,

    /// Page size override for collection reads
    pub page_size: Option<usize>,

    /// Directory for exports and reports
    pub output_dir: Option<PathBuf>,

    pub source: TenantConfig,
    pub destination: TenantConfig,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            page_size: cli.page_size,
            output_dir: cli.output_dir.clone(),
            source: TenantConfig {
                domain: cli.source_domain.clone(),
                api_token: cli.source_token.clone(),
            },
            destination: TenantConfig {
                domain: cli.dest_domain.clone(),
                api_token: cli.dest_token.clone(),
            },
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Flag-level settings for one tenant
    pub fn tenant(&self, role: TenantRole) -> &TenantConfig {
        match role {
            TenantRole::Source => &self.source,
            TenantRole::Destination => &self.destination,
        }
    }
}
