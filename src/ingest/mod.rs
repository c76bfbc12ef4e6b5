//! Decoding of uploaded CSV and spreadsheet files into [`Table`]s.
//!
//! Only the first worksheet of a workbook is read. The first row holds the
//! column names. Blank and NA-like cells become `null`, numeric-looking CSV
//! cells become numbers, everything else is kept as text.

use crate::error::{AppError, Result};
use crate::preprocessing::Table;
use calamine::{Data, Reader, Xls, Xlsx};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

/// Accepted upload formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TabularFormat {
    Csv,
    Xlsx,
    Xls,
}

impl TabularFormat {
    /// Format implied by a file name's extension, ignoring case.
    pub fn from_filename(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?;
        Self::from_str(extension).ok()
    }
}

/// Error text for an upload whose extension is not accepted.
pub const UNSUPPORTED_FILE_MESSAGE: &str = "File type not allowed. Allowed types: CSV, XLS, XLSX";

const NA_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Decode file contents in the given format.
pub fn read_table(bytes: &[u8], format: TabularFormat) -> Result<Table> {
    let table = match format {
        TabularFormat::Csv => read_csv(bytes)?,
        TabularFormat::Xlsx => read_workbook::<Xlsx<Cursor<Vec<u8>>>>(bytes)?,
        TabularFormat::Xls => read_workbook::<Xls<Cursor<Vec<u8>>>>(bytes)?,
    };

    if table.is_empty() {
        return Err(AppError::Validation(
            "The uploaded file contains no data rows".to_string(),
        ));
    }

    tracing::debug!(
        format = %format,
        rows = table.len(),
        columns = table.columns().len(),
        "Decoded tabular file"
    );

    Ok(table)
}

/// Read and decode a file from disk; the format follows the extension.
pub fn read_table_file(path: &Path) -> Result<Table> {
    let name = path.to_string_lossy();
    let format = TabularFormat::from_filename(&name)
        .ok_or_else(|| AppError::UnsupportedFile(UNSUPPORTED_FILE_MESSAGE.to_string()))?;
    let bytes = std::fs::read(path)?;
    read_table(&bytes, format)
}

fn read_csv(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Validation("The uploaded file is empty".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("Could not parse CSV file: {}", e)))?;
    let mut table = Table::new(header_names(headers.iter()));

    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::Validation(format!("Could not parse CSV file: {}", e)))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(parse_text_cell).collect());
    }

    Ok(table)
}

/// Pick the most frequent of `, ; \t |` in the header line, defaulting to a comma.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|&b| b == b'\n').next().unwrap_or(bytes);
    [b',', b';', b'\t', b'|']
        .into_iter()
        .map(|d| (d, header.iter().filter(|&&b| b == d).count()))
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn read_workbook<W>(bytes: &[u8]) -> Result<Table>
where
    W: Reader<Cursor<Vec<u8>>>,
    W::Error: std::fmt::Display,
{
    let invalid = |e: W::Error| AppError::Validation(format!("Could not read spreadsheet: {}", e));

    let mut workbook = W::new(Cursor::new(bytes.to_vec())).map_err(invalid)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Validation("The uploaded workbook has no sheets".to_string()))?
        .map_err(invalid)?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AppError::Validation("The uploaded file is empty".to_string()))?;

    let names: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let mut table = Table::new(header_names(names.iter().map(String::as_str)));

    for row in rows {
        let cells: Vec<Value> = row.iter().map(spreadsheet_cell).collect();
        if cells.iter().all(Value::is_null) {
            continue;
        }
        table.push_row(cells);
    }

    Ok(table)
}

/// Trimmed header names; blanks get a positional placeholder.
fn header_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .enumerate()
        .map(|(idx, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn parse_text_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if NA_TOKENS.contains(&trimmed) {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return json!(int);
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() => json!(float),
        _ => Value::String(cell.to_string()),
    }
}

fn spreadsheet_cell(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => json!(i),
        Data::Float(f) if f.is_finite() => json!(f),
        Data::Float(_) => Value::Null,
        Data::String(s) if NA_TOKENS.contains(&s.trim()) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => json!(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        _ => Value::Null,
    }
}
