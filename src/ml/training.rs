//! Training data preparation and forest fitting.
//!
//! Training rows go through the same normalizer and aligner as prediction
//! input, so a model can only ever be trained on a layout the aligner
//! reproduces at inference time.

use crate::error::{AppError, Result};
use crate::ingest;
use crate::ml::models::{ModelMetadata, ModelType, RegressionMetrics, TrainingParams, TrainingSource};
use crate::ml::regressor::{ProductivityModel, RandomForestModel};
use crate::ml::scoring::{MAX_SCORE, MIN_SCORE};
use crate::preprocessing::aligner::{category_label, coerce_numeric, FeatureAligner};
use crate::preprocessing::{
    normalize_table, PredictionInput, Table, TrainedSchema, NUMERIC_FEATURES, PRODUCTIVITY_SCORE,
    SOIL_TYPE,
};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Soil labels the synthetic generator draws from.
pub const SYNTHETIC_SOIL_TYPES: [&str; 38] = [
    "Loam",
    "Clay",
    "Sandy",
    "Silt",
    "Peat",
    "Chalk",
    "Gravel",
    "Sand",
    "Clay Loam",
    "Sandy Loam",
    "Silty Clay",
    "Sandy Clay",
    "Loamy Sand",
    "Silt Loam",
    "Peat Loam",
    "Chalky Loam",
    "Gravelly Loam",
    "Silty Loam",
    "Clay Sand",
    "Humus",
    "Compost",
    "Topsoil",
    "Subsoil",
    "Black Soil",
    "Red Soil",
    "Yellow Soil",
    "Alluvial Soil",
    "Laterite Soil",
    "Saline Soil",
    "Acidic Soil",
    "Alkaline Soil",
    "Loamy",
    "Silty",
    "Sandy Clay Loam",
    "Silty Clay Loam",
    "Clayey",
    "Silty Sand",
    "Clayey Sand",
];

/// Uniform sampling range per numeric feature, in canonical order.
const FEATURE_RANGES: [(f64, f64); 16] = [
    (0.0, 200.0),
    (5.0, 100.0),
    (50.0, 300.0),
    (4.5, 8.5),
    (0.5, 5.0),
    (0.1, 5.0),
    (5.0, 50.0),
    (0.5, 10.0),
    (2.0, 50.0),
    (0.2, 5.0),
    (1.0, 25.0),
    (0.1, 2.0),
    (10.0, 60.0),
    (15.0, 35.0),
    (30.0, 80.0),
    (50.0, 300.0),
];

/// `(weight, scale)` per numeric feature in canonical order. pH is scored
/// by distance from neutral instead and carries no linear term.
const SCORE_TERMS: [(f64, f64); 16] = [
    (0.15, 200.0),
    (0.10, 100.0),
    (0.10, 300.0),
    (0.0, 1.0),
    (0.08, 5.0),
    (0.05, 5.0),
    (0.05, 50.0),
    (0.03, 10.0),
    (0.03, 50.0),
    (0.03, 5.0),
    (0.03, 25.0),
    (0.02, 2.0),
    (0.10, 60.0),
    (0.08, 35.0),
    (0.08, 80.0),
    (0.07, 300.0),
];

const PH_INDEX: usize = 3;
const PH_WEIGHT: f64 = 0.05;
const PH_OPTIMUM: f64 = 7.0;
const PH_TOLERANCE: f64 = 3.5;
const NOISE_STD: f64 = 5.0;

/// Noise-free productivity for one row of canonical numeric features.
pub fn synthetic_score(values: &[f64; 16]) -> f64 {
    let linear: f64 = values
        .iter()
        .zip(SCORE_TERMS)
        .map(|(v, (weight, scale))| weight * v / scale * 100.0)
        .sum();
    let ph = PH_WEIGHT * (1.0 - (values[PH_INDEX] - PH_OPTIMUM).abs() / PH_TOLERANCE) * 100.0;
    linear + ph
}

/// Standard normal sample (Box-Muller).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Build a synthetic training table: canonical numeric columns, `soil_type`
/// and `productivity_score`.
pub fn synthetic_table(n_samples: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);

    let columns = NUMERIC_FEATURES
        .iter()
        .chain([&SOIL_TYPE, &PRODUCTIVITY_SCORE])
        .map(|s| s.to_string())
        .collect();
    let mut table = Table::new(columns);

    for _ in 0..n_samples {
        let mut values = [0.0; 16];
        for (value, (low, high)) in values.iter_mut().zip(FEATURE_RANGES) {
            *value = rng.gen_range(low..high);
        }

        let soil = SYNTHETIC_SOIL_TYPES[rng.gen_range(0..SYNTHETIC_SOIL_TYPES.len())];
        let score = (synthetic_score(&values) + NOISE_STD * standard_normal(&mut rng))
            .clamp(MIN_SCORE, MAX_SCORE);

        let mut row: Vec<Value> = values.iter().map(|v| json!(v)).collect();
        row.push(json!(soil));
        row.push(json!(score));
        table.push_row(row);
    }

    table
}

/// Aligned training rows with their targets.
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples × schema width)
    pub features: Array2<f64>,

    pub targets: Vec<f64>,

    pub schema: TrainedSchema,

    pub source: TrainingSource,
}

impl TrainingDataset {
    /// Synthetic dataset following the built-in data recipe.
    pub fn synthetic(n_samples: usize, seed: u64) -> Result<Self> {
        Self::from_table(
            synthetic_table(n_samples, seed),
            TrainingSource::Synthetic { n_samples, seed },
        )
    }

    /// Load a CSV or spreadsheet training file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let table = ingest::read_table_file(path)?;
        Self::from_table(
            table,
            TrainingSource::File {
                path: path.display().to_string(),
            },
        )
    }

    /// Build a dataset from a raw table.
    ///
    /// Columns are normalized first. The layout is the canonical numeric
    /// features present in the table plus one indicator per distinct soil
    /// label, sorted.
    pub fn from_table(table: Table, source: TrainingSource) -> Result<Self> {
        let table = normalize_table(table);

        let target_idx = table.column_index(PRODUCTIVITY_SCORE).ok_or_else(|| {
            AppError::Training(format!("training data has no {} column", PRODUCTIVITY_SCORE))
        })?;

        let numeric: Vec<&str> = NUMERIC_FEATURES
            .iter()
            .copied()
            .filter(|name| table.column_index(name).is_some())
            .collect();
        if numeric.is_empty() {
            return Err(AppError::Training(
                "training data has no numeric feature columns".to_string(),
            ));
        }

        let categories: BTreeSet<String> = match table.column_index(SOIL_TYPE) {
            Some(idx) => table
                .rows()
                .iter()
                .filter_map(|row| category_label(&row[idx]))
                .collect(),
            None => BTreeSet::new(),
        };

        let mut targets = Vec::with_capacity(table.len());
        let mut bad_targets = Vec::new();
        for (idx, row) in table.rows().iter().enumerate() {
            match coerce_numeric(&row[target_idx]) {
                Some(target) => targets.push(target),
                None => bad_targets.push(idx.to_string()),
            }
        }
        if !bad_targets.is_empty() {
            return Err(AppError::Training(format!(
                "invalid {} in records {}",
                PRODUCTIVITY_SCORE,
                bad_targets.join(", ")
            )));
        }

        let schema = TrainedSchema::for_training(numeric, categories)
            .map_err(|e| AppError::Training(e.to_string()))?;

        let input = PredictionInput::Table(table);
        let aligned = FeatureAligner::new(&schema)
            .align(&input)
            .map_err(|e| AppError::Training(format!("training data rejected: {}", e)))?;

        Ok(Self {
            features: aligned.features,
            targets,
            schema,
            source,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }

    /// Shuffled train/test split. The test part holds `ceil(n * test_size)` rows.
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> (TrainingDataset, TrainingDataset) {
        let n = self.n_samples();
        let n_test = ((n as f64 * test_size).ceil() as usize).min(n);

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        let (test_idx, train_idx) = indices.split_at(n_test);

        (self.subset(train_idx), self.subset(test_idx))
    }

    fn subset(&self, rows: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: self.features.select(Axis(0), rows),
            targets: rows.iter().map(|&i| self.targets[i]).collect(),
            schema: self.schema.clone(),
            source: self.source.clone(),
        }
    }
}

/// Build the dataset described by `params`: a training file when one is
/// configured, synthetic data otherwise.
pub fn load_dataset(params: &TrainingParams, training_data: Option<&Path>) -> Result<TrainingDataset> {
    match training_data {
        Some(path) => TrainingDataset::from_file(path),
        None => TrainingDataset::synthetic(params.n_samples, params.seed),
    }
}

/// Fit a forest on the training part and evaluate it on the held-out part.
pub fn train_random_forest(
    dataset: &TrainingDataset,
    params: &TrainingParams,
) -> Result<RandomForestModel> {
    let (train, test) = dataset.train_test_split(params.test_size, params.seed);

    let metadata = ModelMetadata {
        id: uuid::Uuid::new_v4(),
        model_type: ModelType::RandomForest,
        trained_at: chrono::Utc::now(),
        n_training_samples: train.n_samples(),
        n_features: dataset.schema.width(),
        n_estimators: params.n_trees,
        max_depth: params.max_depth,
        test_metrics: None,
        source: dataset.source.clone(),
        hyperparameters: params.hyperparameters(),
    };

    info!(
        source = %dataset.source,
        n_train = train.n_samples(),
        n_test = test.n_samples(),
        n_features = dataset.schema.width(),
        n_categories = dataset.schema.soil_categories().len(),
        "Training random forest"
    );

    let mut model = RandomForestModel::fit(
        &train.features,
        &train.targets,
        dataset.schema.clone(),
        params,
        metadata,
    )?;

    if test.n_samples() > 0 {
        let predicted = model.predict(&test.features)?;
        let metrics = RegressionMetrics::evaluate(&test.targets, &predicted);
        info!(mse = metrics.mse, r2 = metrics.r2, "Model evaluated on held-out rows");
        model.metadata_mut().test_metrics = Some(metrics);
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_score_formula() {
        let mut values = [0.0; 16];
        values[PH_INDEX] = 7.0;
        assert!((synthetic_score(&values) - 5.0).abs() < 1e-9);

        values[0] = 200.0;
        assert!((synthetic_score(&values) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthetic_table_is_deterministic() {
        let a = synthetic_table(20, 7);
        let b = synthetic_table(20, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert_eq!(a.columns().len(), 18);
    }

    #[test]
    fn test_synthetic_values_in_range() {
        let table = synthetic_table(200, 42);
        for row in table.rows() {
            for (value, (low, high)) in row.iter().zip(FEATURE_RANGES) {
                let v = value.as_f64().unwrap();
                assert!(v >= low && v < high);
            }
            let score = row[17].as_f64().unwrap();
            assert!((0.0..=100.0).contains(&score));
        }
    }

    #[test]
    fn test_dataset_layout_from_table() {
        let table = Table::with_rows(
            vec!["N".into(), "pH".into(), "Soil Type".into(), "yield".into()],
            vec![
                vec![json!(10), json!(6.5), json!("Loam"), json!(40)],
                vec![json!(20), json!("7.1"), json!("Clay"), json!("55")],
                vec![json!(30), json!(5.9), json!(null), json!(61)],
            ],
        );

        let dataset = TrainingDataset::from_table(table, TrainingSource::File { path: "t.csv".into() })
            .unwrap();

        assert_eq!(
            dataset.schema.feature_order(),
            &["nitrogen", "ph", "soil_type_Clay", "soil_type_Loam"]
        );
        assert_eq!(dataset.targets, vec![40.0, 55.0, 61.0]);
        assert_eq!(dataset.features.row(1).to_vec(), vec![20.0, 7.1, 1.0, 0.0]);
        assert_eq!(dataset.features.row(2).to_vec(), vec![30.0, 5.9, 0.0, 0.0]);
    }

    #[test]
    fn test_dataset_requires_target() {
        let table = Table::with_rows(vec!["nitrogen".into()], vec![vec![json!(1)]]);
        let err = TrainingDataset::from_table(table, TrainingSource::File { path: "x".into() })
            .unwrap_err();
        assert!(matches!(err, AppError::Training(_)));
    }

    #[test]
    fn test_train_test_split_sizes() {
        let dataset = TrainingDataset::synthetic(50, 3).unwrap();
        let (train, test) = dataset.train_test_split(0.2, 3);

        assert_eq!(train.n_samples(), 40);
        assert_eq!(test.n_samples(), 10);
        assert_eq!(train.features.ncols(), dataset.schema.width());
    }
}
