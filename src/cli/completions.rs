//! Static shell completions
//!
//! Subcommands, flags and resource names only; nothing queries a tenant.

use std::io::Write;

use clap::CommandFactory;

use crate::cli::{Cli, Shell};
use crate::error::Result;

/// Write the completion script for `shell` to `out`.
pub fn generate(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, out);
    Ok(())
}

/// Run the completion command
pub fn run(shell: Shell) -> Result<()> {
    generate(shell, &mut std::io::stdout())
}
