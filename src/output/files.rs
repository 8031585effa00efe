//! Report files: CSV, XLSX and JSON
//!
//! A [`Sheet`] holds raw API items. For the tabular formats each item is
//! flattened into one row: nested objects become dotted column names and
//! arrays are written as JSON text. Columns are the union of keys in
//! first-seen order.

use std::path::{Path, PathBuf};

use csv::Writer;
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::{Map, Value};

use crate::error::Result;

/// Excel caps sheet names at 31 characters
const MAX_SHEET_NAME: usize = 31;

/// Most characters an Excel cell holds
const MAX_CELL_CHARS: usize = 32_767;

/// File formats for exports and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FileFormat {
    Csv,
    #[default]
    Xlsx,
    Json,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Json => "json",
        }
    }
}

/// Named list of raw items
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub items: Vec<Value>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Column names and flattened rows.
    pub fn table(&self) -> (Vec<String>, Vec<Map<String, Value>>) {
        let rows: Vec<Map<String, Value>> = self.items.iter().map(flatten).collect();
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        (columns, rows)
    }
}

/// Flatten one item into a single-level row.
pub fn flatten(item: &Value) -> Map<String, Value> {
    let mut row = Map::new();
    match item {
        Value::Object(map) => flatten_into(&mut row, None, map),
        other => {
            row.insert("value".to_string(), scalar(other));
        }
    }
    row
}

fn flatten_into(row: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let column = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(row, Some(&column), nested),
            other => {
                row.insert(column, scalar(other));
            }
        }
    }
}

fn scalar(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// Text form of a cell.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write one sheet as CSV.
pub fn write_csv(path: &Path, sheet: &Sheet) -> Result<()> {
    let (columns, rows) = sheet.table();
    let mut writer = Writer::from_path(path)?;
    writer.write_record(&columns)?;
    for row in &rows {
        writer.write_record(columns.iter().map(|c| cell_text(row.get(c))))?;
    }
    writer.flush()?;
    Ok(())
}

/// Cut text to what one Excel cell can hold.
fn excel_text(text: String, row: u32, col: u16) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text;
    }
    warn!(
        "Cell at row {} column {} exceeds {} characters and was truncated",
        row + 1,
        col + 1,
        MAX_CELL_CHARS
    );
    text.chars().take(MAX_CELL_CHARS).collect()
}

/// Excel-safe sheet name.
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: Option<&Value>) -> Result<()> {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => {
                worksheet.write_number(row, col, f)?;
            }
            None => {
                worksheet.write_string(row, col, n.to_string())?;
            }
        },
        Some(Value::Bool(b)) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Some(other) => {
            worksheet.write_string(row, col, excel_text(cell_text(Some(other)), row, col))?;
        }
    }
    Ok(())
}

/// Write every sheet into one workbook.
pub fn write_xlsx(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&sheet.name))?;

        let (columns, rows) = sheet.table();
        for (col, name) in columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &header)?;
        }
        for (index, row) in rows.iter().enumerate() {
            let row_num = (index + 1) as u32;
            for (col, name) in columns.iter().enumerate() {
                write_cell(worksheet, row_num, col as u16, row.get(name))?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Write raw items as pretty JSON: an array for one sheet, otherwise an
/// object keyed by sheet name.
pub fn write_json(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let value = match sheets {
        [single] => Value::Array(single.items.clone()),
        many => Value::Object(
            many.iter()
                .map(|s| (s.name.clone(), Value::Array(s.items.clone())))
                .collect(),
        ),
    };
    std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Write sheets under `dir` as `<stem>.<ext>`.
///
/// CSV holds one sheet per file, so several sheets produce
/// `<stem>_<sheet>.csv` files instead. Returns the paths written.
pub fn write_sheets(dir: &Path, stem: &str, format: FileFormat, sheets: &[Sheet]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let single = dir.join(format!("{}.{}", stem, format.extension()));

    let written = match format {
        FileFormat::Xlsx => {
            write_xlsx(&single, sheets)?;
            vec![single]
        }
        FileFormat::Json => {
            write_json(&single, sheets)?;
            vec![single]
        }
        FileFormat::Csv if sheets.len() == 1 => {
            write_csv(&single, &sheets[0])?;
            vec![single]
        }
        FileFormat::Csv => {
            let mut paths = Vec::with_capacity(sheets.len());
            for sheet in sheets {
                let path = dir.join(format!("{}_{}.csv", stem, slug(&sheet.name)));
                write_csv(&path, sheet)?;
                paths.push(path);
            }
            paths
        }
    };

    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(written)
}
