//! Schema normalizer: rewrites input keys and column names to canonical
//! feature names through the alias table.
//!
//! Normalization never fails and never touches values. Keys without an alias
//! are kept as they are; required-field checks happen in the aligner.
//!
//! When several keys resolve to the same canonical name, a key spelled
//! exactly as the canonical name wins, otherwise the first one in input
//! order (record keys keep the order they were submitted in). The losing
//! keys keep their original spelling.

use crate::preprocessing::aliases::canonical_name;
use crate::preprocessing::record::{PredictionInput, RawRecord, Table};
use std::collections::HashSet;

/// Normalize any prediction input.
pub fn normalize(input: PredictionInput) -> PredictionInput {
    match input {
        PredictionInput::Single(record) => PredictionInput::Single(normalize_record(&record)),
        PredictionInput::Batch(records) => {
            PredictionInput::Batch(records.iter().map(normalize_record).collect())
        }
        PredictionInput::Table(table) => PredictionInput::Table(normalize_table(table)),
    }
}

/// Normalize the keys of a single record.
pub fn normalize_record(record: &RawRecord) -> RawRecord {
    let renamed = resolve_names(record.keys().map(String::as_str));

    record
        .iter()
        .zip(renamed)
        .map(|((_, value), name)| (name, value.clone()))
        .collect()
}

/// Normalize the column names of a table. Rows are left untouched.
pub fn normalize_table(mut table: Table) -> Table {
    let renamed = resolve_names(table.columns().iter().map(String::as_str));

    for (idx, name) in renamed.into_iter().enumerate() {
        if table.columns()[idx] != name {
            table.rename_column(idx, name);
        }
    }

    table
}

/// Output name for each input name, in input order.
fn resolve_names<'a, I>(names: I) -> Vec<String>
where
    I: Iterator<Item = &'a str> + Clone,
{
    // Canonical spellings already present claim their slot up front.
    let mut claimed: HashSet<&str> = names
        .clone()
        .filter(|name| canonical_name(name) == Some(*name))
        .collect();

    names
        .map(|name| match canonical_name(name) {
            Some(canonical) if canonical == name => name.to_string(),
            Some(canonical) if claimed.insert(canonical) => canonical.to_string(),
            _ => name.to_string(),
        })
        .collect()
}
