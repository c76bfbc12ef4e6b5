use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One observation as submitted: arbitrary keys, arbitrary JSON values.
pub type RawRecord = Map<String, Value>;

/// Rows of named columns, as decoded from an uploaded CSV or spreadsheet.
///
/// Every row holds exactly one cell per column; short rows are padded with
/// `null` and long rows are truncated on insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Column name to position. The first column wins when names repeat.
    pub fn column_lookup(&self) -> HashMap<&str, usize> {
        let mut lookup = HashMap::with_capacity(self.columns.len());
        for (idx, name) in self.columns.iter().enumerate() {
            lookup.entry(name.as_str()).or_insert(idx);
        }
        lookup
    }

    /// Rename a column in place.
    pub(crate) fn rename_column(&mut self, idx: usize, name: String) {
        self.columns[idx] = name;
    }

    /// Row `idx` as a record keyed by column name.
    pub fn row_record(&self, idx: usize) -> Option<RawRecord> {
        let row = self.rows.get(idx)?;
        let mut record = RawRecord::new();
        for (name, value) in self.columns.iter().zip(row) {
            if !record.contains_key(name) {
                record.insert(name.clone(), value.clone());
            }
        }
        Some(record)
    }
}

/// A prediction request after the entry point has decided what it holds.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionInput {
    /// A single key/value record.
    Single(RawRecord),

    /// An ordered list of records.
    Batch(Vec<RawRecord>),

    /// A decoded file.
    Table(Table),
}

impl PredictionInput {
    /// Number of records that will be scored.
    pub fn len(&self) -> usize {
        match self {
            PredictionInput::Single(_) => 1,
            PredictionInput::Batch(records) => records.len(),
            PredictionInput::Table(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionInput::Single(_) => "single",
            PredictionInput::Batch(_) => "batch",
            PredictionInput::Table(_) => "table",
        }
    }
}
