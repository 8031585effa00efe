//! Display models for table and JSON output

mod common;
mod report;
mod status;

pub use report::{OutcomeDisplay, ReportDisplay};
pub use status::TenantDisplay;
