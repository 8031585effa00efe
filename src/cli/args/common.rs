//! Common CLI types shared across commands

/// Console output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table format - one row per entry (global default)
    #[default]
    Table,
    /// JSON format - structured for scripts
    Json,
}
