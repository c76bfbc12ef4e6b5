use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Hyperparameters and data recipe for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TrainingParams {
    /// Synthetic samples to generate when no training file is given
    #[validate(range(min = 10, max = 1_000_000))]
    pub n_samples: usize,

    /// Trees in the forest
    #[validate(range(min = 1, max = 2000))]
    pub n_trees: usize,

    /// Maximum depth of each tree
    #[validate(range(min = 1, max = 64))]
    pub max_depth: u16,

    /// Minimum samples required to split a node
    #[validate(range(min = 2))]
    pub min_samples_split: usize,

    /// Seed for data generation, shuffling and bootstrapping
    pub seed: u64,

    /// Fraction of rows held out for evaluation
    #[validate(range(min = 0.0, max = 0.5))]
    pub test_size: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
            test_size: 0.2,
        }
    }
}

impl TrainingParams {
    pub fn hyperparameters(&self) -> HashMap<String, String> {
        HashMap::from([
            ("n_trees".to_string(), self.n_trees.to_string()),
            ("max_depth".to_string(), self.max_depth.to_string()),
            (
                "min_samples_split".to_string(),
                self.min_samples_split.to_string(),
            ),
            ("seed".to_string(), self.seed.to_string()),
            ("test_size".to_string(), self.test_size.to_string()),
        ])
    }
}

/// Held-out evaluation of a regressor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error
    pub mse: f64,

    /// Coefficient of determination
    pub r2: f64,

    /// Rows the metrics were computed on
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute MSE and R² for paired targets and predictions.
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Self::default();
        }

        let mean = actual[..n].iter().sum::<f64>() / n as f64;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (a, p) in actual.iter().zip(predicted).take(n) {
            ss_res += (a - p).powi(2);
            ss_tot += (a - mean).powi(2);
        }

        Self {
            mse: ss_res / n as f64,
            r2: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
            n_samples: n,
        }
    }
}

/// Where the training rows came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingSource {
    Synthetic { n_samples: usize, seed: u64 },
    File { path: String },
}

impl std::fmt::Display for TrainingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingSource::Synthetic { n_samples, seed } => {
                write!(f, "synthetic ({} samples, seed {})", n_samples, seed)
            }
            TrainingSource::File { path } => write!(f, "file {}", path),
        }
    }
}

/// Model type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[strum(serialize = "RandomForestRegressor")]
    RandomForest,
}

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unique id of this trained artifact
    pub id: uuid::Uuid,

    /// Model type
    pub model_type: ModelType,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Rows used to fit the model
    pub n_training_samples: usize,

    /// Width of the trained feature vector
    pub n_features: usize,

    /// Trees in the forest
    pub n_estimators: usize,

    /// Tree depth limit
    pub max_depth: u16,

    /// Held-out metrics, absent when nothing was held out
    pub test_metrics: Option<RegressionMetrics>,

    pub source: TrainingSource,

    /// Hyperparameters
    pub hyperparameters: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_params_default() {
        let params = TrainingParams::default();
        assert_eq!(params.n_trees, 100);
        assert_eq!(params.max_depth, 10);
        assert_eq!(params.seed, 42);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_training_params_validation() {
        let params = TrainingParams {
            n_trees: 0,
            ..TrainingParams::default()
        };
        assert!(params.validate().is_err());

        let params = TrainingParams {
            test_size: 0.9,
            ..TrainingParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_regression_metrics() {
        let perfect = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(perfect.mse, 0.0);
        assert_eq!(perfect.r2, 1.0);

        let mean_only = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]);
        assert!((mean_only.mse - 2.0 / 3.0).abs() < 1e-12);
        assert!(mean_only.r2.abs() < 1e-12);
    }

    #[test]
    fn test_model_type_display() {
        assert_eq!(ModelType::RandomForest.to_string(), "RandomForestRegressor");
    }

    #[test]
    fn test_training_source_display() {
        let source = TrainingSource::Synthetic {
            n_samples: 1000,
            seed: 42,
        };
        assert_eq!(source.to_string(), "synthetic (1000 samples, seed 42)");
    }
}
