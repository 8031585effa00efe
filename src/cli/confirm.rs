//! Interactive confirmation for sync plans

use std::io::IsTerminal;

use dialoguer::Confirm as Prompt;
use indicatif::ProgressBar;
use log::warn;

use crate::error::Result;
use crate::sync::Confirm;

/// Asks on the terminal, pausing the progress spinner while waiting.
pub struct TerminalConfirm {
    spinner: Option<ProgressBar>,
}

impl TerminalConfirm {
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Suspend `spinner` while a prompt is shown
    pub fn with_spinner(mut self, spinner: ProgressBar) -> Self {
        self.spinner = Some(spinner);
        self
    }

    fn ask(prompt: &str) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            warn!("{} (no terminal; declining, use --yes to apply)", prompt);
            return Ok(false);
        }
        Ok(Prompt::new().with_prompt(prompt).default(false).interact()?)
    }
}

impl Default for TerminalConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| Self::ask(prompt)),
            None => Self::ask(prompt),
        }
    }
}
