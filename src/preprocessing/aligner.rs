//! Feature aligner: turns normalized records into the exact feature matrix a
//! trained model expects.
//!
//! Every input shape goes through the same per-record routine:
//! presence check, numeric coercion, invalid-value scan over the numeric
//! columns, soil-type one-hot expansion, placement in trained column order.
//! Missing fields are checked for the whole input before any coercion, so a
//! missing field is always reported as missing, and a present field that
//! fails coercion is always reported as invalid.

use crate::preprocessing::aliases::SOIL_TYPE;
use crate::preprocessing::error::AlignError;
use crate::preprocessing::record::{PredictionInput, RawRecord, Table};
use crate::preprocessing::schema::TrainedSchema;
use ndarray::{Array2, ArrayViewMut1};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Output of a successful alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBatch {
    /// `[n_records, schema.width()]`, columns in trained order.
    pub features: Array2<f64>,

    /// Raw soil-type label per record, as submitted.
    pub soil_types: Vec<Option<String>>,

    /// Distinct labels that matched no trained category.
    pub unrecognized_soil_types: Vec<String>,
}

impl AlignedBatch {
    pub fn n_records(&self) -> usize {
        self.features.nrows()
    }
}

/// Align a normalized input against a trained schema.
///
/// Fails with [`AlignError::ModelNotReady`] when no schema is available.
pub fn align(
    input: &PredictionInput,
    schema: Option<&TrainedSchema>,
) -> Result<AlignedBatch, AlignError> {
    let schema = schema
        .ok_or_else(|| AlignError::ModelNotReady("no trained model is loaded".to_string()))?;
    FeatureAligner::new(schema).align(input)
}

/// Read access to one record's fields by canonical name.
trait FieldSource {
    fn field(&self, name: &str) -> Option<&Value>;
}

impl FieldSource for RawRecord {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

struct TableRow<'t> {
    lookup: &'t HashMap<&'t str, usize>,
    cells: &'t [Value],
}

impl FieldSource for TableRow<'_> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.lookup.get(name).and_then(|&idx| self.cells.get(idx))
    }
}

/// Aligns inputs against one trained schema.
pub struct FeatureAligner<'s> {
    schema: &'s TrainedSchema,
}

impl<'s> FeatureAligner<'s> {
    pub fn new(schema: &'s TrainedSchema) -> Self {
        Self { schema }
    }

    pub fn align(&self, input: &PredictionInput) -> Result<AlignedBatch, AlignError> {
        match input {
            PredictionInput::Single(record) => self.align_records(std::slice::from_ref(record), false),
            PredictionInput::Batch(records) => self.align_records(records, true),
            PredictionInput::Table(table) => self.align_table(table),
        }
    }

    fn align_records(
        &self,
        records: &[RawRecord],
        indexed: bool,
    ) -> Result<AlignedBatch, AlignError> {
        for (idx, record) in records.iter().enumerate() {
            let missing = self.missing_fields(|name| record.field(name).is_some());
            if !missing.is_empty() {
                return Err(AlignError::MissingFeature {
                    record: indexed.then_some(idx),
                    fields: missing,
                });
            }
        }

        self.fill(records, indexed)
    }

    fn align_table(&self, table: &Table) -> Result<AlignedBatch, AlignError> {
        let lookup = table.column_lookup();

        let missing = self.missing_fields(|name| lookup.contains_key(name));
        if !missing.is_empty() {
            return Err(AlignError::MissingFeature {
                record: None,
                fields: missing,
            });
        }

        let rows: Vec<TableRow<'_>> = table
            .rows()
            .iter()
            .map(|cells| TableRow {
                lookup: &lookup,
                cells,
            })
            .collect();

        self.fill(&rows, true)
    }

    /// Required numeric features the predicate reports absent, in trained order.
    fn missing_fields<F>(&self, present: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.schema
            .numeric_features()
            .filter(|name| !present(name))
            .map(str::to_string)
            .collect()
    }

    /// Coerce, validate and place every record. Presence is already checked.
    fn fill<S: FieldSource>(
        &self,
        sources: &[S],
        indexed: bool,
    ) -> Result<AlignedBatch, AlignError> {
        let mut features = Array2::zeros((sources.len(), self.schema.width()));
        let mut soil_types = Vec::with_capacity(sources.len());
        let mut unrecognized = BTreeSet::new();

        let mut bad_records = Vec::new();
        let mut bad_fields = BTreeSet::new();

        for (idx, (source, row)) in sources.iter().zip(features.rows_mut()).enumerate() {
            match self.align_one(source, row) {
                Ok(label) => {
                    if let Some(label) = &label {
                        if self.schema.indicator_position(label).is_none() {
                            unrecognized.insert(label.clone());
                        }
                    }
                    soil_types.push(label);
                }
                Err(invalid) => {
                    bad_records.push(idx);
                    bad_fields.extend(invalid);
                }
            }
        }

        if !bad_records.is_empty() {
            let fields = self
                .schema
                .numeric_features()
                .filter(|name| bad_fields.contains(name))
                .map(str::to_string)
                .collect();

            return Err(AlignError::InvalidValue {
                records: if indexed { bad_records } else { Vec::new() },
                fields,
            });
        }

        if !unrecognized.is_empty() {
            tracing::debug!(
                labels = ?unrecognized,
                "Soil types outside the trained categories treated as unknown"
            );
        }

        Ok(AlignedBatch {
            features,
            soil_types,
            unrecognized_soil_types: unrecognized.into_iter().collect(),
        })
    }

    /// Write one record into `row`. Returns the raw soil-type label, or the
    /// numeric fields that failed coercion.
    fn align_one<'a, S: FieldSource>(
        &'a self,
        source: &S,
        mut row: ArrayViewMut1<'_, f64>,
    ) -> Result<Option<String>, Vec<&'a str>> {
        let mut invalid = Vec::new();

        for (name, column) in self.schema.numeric_columns() {
            match source.field(name).and_then(coerce_numeric) {
                Some(value) => row[*column] = value,
                None => invalid.push(name.as_str()),
            }
        }

        if !invalid.is_empty() {
            return Err(invalid);
        }

        let label = source.field(SOIL_TYPE).and_then(category_label);
        if let Some(column) = label
            .as_deref()
            .and_then(|l| self.schema.indicator_position(l))
        {
            row[column] = 1.0;
        }

        Ok(label)
    }
}

/// Numeric coercion: JSON numbers and numeric strings become `f64`, anything
/// else (including NaN and infinities) is invalid.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Category label carried by a `soil_type` value. Null means no category.
pub fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::aliases::NUMERIC_FEATURES;
    use serde_json::json;

    fn schema() -> TrainedSchema {
        TrainedSchema::canonical(vec![
            "Clay".to_string(),
            "Loam".to_string(),
            "Sandy".to_string(),
        ])
        .unwrap()
    }

    fn complete_record() -> RawRecord {
        NUMERIC_FEATURES
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), json!(i as f64 + 1.0)))
            .collect()
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&json!(3)), Some(3.0));
        assert_eq!(coerce_numeric(&json!(" 6.5 ")), Some(6.5));
        assert_eq!(coerce_numeric(&json!("1e2")), Some(100.0));
        assert_eq!(coerce_numeric(&json!("abc")), None);
        assert_eq!(coerce_numeric(&json!("NaN")), None);
        assert_eq!(coerce_numeric(&json!("inf")), None);
        assert_eq!(coerce_numeric(&Value::Null), None);
        assert_eq!(coerce_numeric(&json!(true)), None);
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label(&json!("Loam")), Some("Loam".to_string()));
        assert_eq!(category_label(&json!(3)), Some("3".to_string()));
        assert_eq!(category_label(&Value::Null), None);
    }

    #[test]
    fn test_single_record_layout() {
        let schema = schema();
        let mut record = complete_record();
        record.insert("soil_type".into(), json!("Loam"));

        let aligned = align(&PredictionInput::Single(record), Some(&schema)).unwrap();
        let row = aligned.features.row(0);

        assert_eq!(aligned.features.dim(), (1, 19));
        for (i, _) in NUMERIC_FEATURES.iter().enumerate() {
            assert_eq!(row[i], i as f64 + 1.0);
        }
        assert_eq!(row[16], 0.0);
        assert_eq!(row[17], 1.0);
        assert_eq!(row[18], 0.0);
        assert_eq!(aligned.soil_types, vec![Some("Loam".to_string())]);
    }

    #[test]
    fn test_no_schema_is_model_not_ready() {
        let err = align(&PredictionInput::Single(complete_record()), None).unwrap_err();
        assert!(matches!(err, AlignError::ModelNotReady(_)));
    }

    #[test]
    fn test_missing_reported_before_invalid() {
        let schema = schema();
        let mut record = complete_record();
        record.remove("zinc");
        record.insert("ph".into(), json!("abc"));

        let err = align(&PredictionInput::Single(record), Some(&schema)).unwrap_err();
        assert_eq!(
            err,
            AlignError::MissingFeature {
                record: None,
                fields: vec!["zinc".to_string()],
            }
        );
    }

    #[test]
    fn test_null_value_is_invalid_not_missing() {
        let schema = schema();
        let mut record = complete_record();
        record.insert("boron".into(), Value::Null);

        let err = align(&PredictionInput::Single(record), Some(&schema)).unwrap_err();
        assert_eq!(
            err,
            AlignError::InvalidValue {
                records: vec![],
                fields: vec!["boron".to_string()],
            }
        );
    }

    #[test]
    fn test_batch_missing_names_record() {
        let schema = schema();
        let mut second = complete_record();
        second.remove("rainfall");

        let input = PredictionInput::Batch(vec![complete_record(), second]);
        let err = align(&input, Some(&schema)).unwrap_err();

        assert_eq!(
            err,
            AlignError::MissingFeature {
                record: Some(1),
                fields: vec!["rainfall".to_string()],
            }
        );
    }

    #[test]
    fn test_table_invalid_rows_collected() {
        let schema = schema();
        let columns: Vec<String> = NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect();
        let good: Vec<Value> = (0..16).map(|i| json!(i)).collect();
        let mut bad = good.clone();
        bad[3] = json!("acidic");
        bad[0] = json!("");

        let table = Table::with_rows(columns, vec![good.clone(), bad, good]);
        let err = align(&PredictionInput::Table(table), Some(&schema)).unwrap_err();

        assert_eq!(
            err,
            AlignError::InvalidValue {
                records: vec![1],
                fields: vec!["nitrogen".to_string(), "ph".to_string()],
            }
        );
    }

    #[test]
    fn test_unrecognized_soil_types_reported() {
        let schema = schema();
        let mut a = complete_record();
        a.insert("soil_type".into(), json!("Peat"));
        let mut b = complete_record();
        b.insert("soil_type".into(), json!("Clay"));

        let aligned = align(&PredictionInput::Batch(vec![a, b]), Some(&schema)).unwrap();

        assert_eq!(aligned.unrecognized_soil_types, vec!["Peat".to_string()]);
        assert_eq!(aligned.features.row(0).slice(ndarray::s![16..]).sum(), 0.0);
        assert_eq!(aligned.features[[1, 16]], 1.0);
    }
}
