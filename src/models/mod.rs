//! Display models
//!
//! Converts sync reports and resolved configuration into rows for table and
//! JSON output.

pub mod display;

pub use display::{OutcomeDisplay, ReportDisplay, TenantDisplay};
