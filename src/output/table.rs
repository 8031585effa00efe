//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{
        Alignment, Modify, Style, Width,
        object::{Rows, Segment},
    },
};

/// API error bodies and skip reasons beyond this are cut in the console
const MAX_CELL_WIDTH: usize = 80;

/// Render rows with rounded borders and a centered header.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "Nothing to report.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Segment::all()).with(Width::truncate(MAX_CELL_WIDTH).suffix("…")))
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}
