//! Shared fixtures for integration tests.

#![allow(dead_code)]

use ndarray::Array2;
use serde_json::{json, Value};
use soil_productivity::{
    ml::{ModelMetadata, ModelType, ProductivityModel, TrainingSource},
    preprocessing::{RawRecord, TrainedSchema},
    Result,
};
use std::collections::HashMap;

/// Soil categories the fixture model was "trained" on.
pub const TRAINED_SOILS: [&str; 3] = ["Clay", "Loam", "Sandy"];

/// Deterministic stand-in for a trained forest: the score is half the
/// nitrogen column plus 10 for loam.
pub struct StubModel {
    schema: TrainedSchema,
    metadata: ModelMetadata,
}

impl StubModel {
    pub fn new() -> Self {
        let schema = trained_schema();
        Self {
            metadata: ModelMetadata {
                id: uuid::Uuid::new_v4(),
                model_type: ModelType::RandomForest,
                trained_at: chrono::Utc::now(),
                n_training_samples: 100,
                n_features: schema.width(),
                n_estimators: 10,
                max_depth: 5,
                test_metrics: None,
                source: TrainingSource::Synthetic {
                    n_samples: 100,
                    seed: 42,
                },
                hyperparameters: HashMap::new(),
            },
            schema,
        }
    }
}

impl ProductivityModel for StubModel {
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let loam = self.schema.indicator_position("Loam");
        Ok(features
            .rows()
            .into_iter()
            .map(|row| row[0] / 2.0 + loam.map(|idx| row[idx] * 10.0).unwrap_or_default())
            .collect())
    }

    fn schema(&self) -> &TrainedSchema {
        &self.schema
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

pub fn trained_schema() -> TrainedSchema {
    TrainedSchema::canonical(TRAINED_SOILS.iter().map(|s| s.to_string())).unwrap()
}

/// A complete sample in canonical names.
pub fn sample_record() -> RawRecord {
    let value = json!({
        "nitrogen": 150,
        "phosphorus": 30,
        "potassium": 200,
        "ph": 6.5,
        "organic_matter": 2.0,
        "electrical_conductivity": 1.0,
        "sulphur": 10,
        "zinc": 2,
        "iron": 10,
        "copper": 1,
        "manganese": 5,
        "boron": 0.5,
        "moisture": 45,
        "temperature": 25,
        "humidity": 50,
        "rainfall": 100,
        "soil_type": "Loam"
    });
    match value {
        Value::Object(record) => record,
        _ => unreachable!(),
    }
}

/// Numeric values of [`sample_record`] in canonical order.
pub const SAMPLE_VALUES: [f64; 16] = [
    150.0, 30.0, 200.0, 6.5, 2.0, 1.0, 10.0, 2.0, 10.0, 1.0, 5.0, 0.5, 45.0, 25.0, 50.0, 100.0,
];
