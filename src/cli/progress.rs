//! Progress spinner for long-running tenant calls

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner on stderr for indeterminate work.
///
/// Drawing is skipped automatically when stderr is not a terminal.
pub fn spinner(message: impl Into<String>, dry_run: bool) -> ProgressBar {
    let template = if dry_run {
        "{spinner:.yellow} (dry-run) {msg} [{elapsed}]"
    } else {
        "{spinner:.green} {msg} [{elapsed}]"
    };
    let style = ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let bar = ProgressBar::new_spinner();
    bar.set_style(style);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
