//! Productivity model: training, persistence, the installed snapshot and
//! the prediction service built on top of them.

pub mod models;
pub mod persistence;
pub mod registry;
pub mod regressor;
pub mod scoring;
pub mod service;
pub mod training;

pub use models::{ModelMetadata, ModelType, RegressionMetrics, TrainingParams, TrainingSource};
pub use persistence::{load_model, save_model};
pub use registry::{ModelRegistry, ModelSnapshot};
pub use regressor::{ProductivityModel, RandomForestModel};
pub use scoring::{clamp_score, ProductivityLevel, Score, ScoreSummary};
pub use service::{
    ModelInfo, PredictionOutcome, PredictionService, RetrainOverrides, DEFAULT_SOIL_TYPES,
};
pub use training::{load_dataset, synthetic_table, train_random_forest, TrainingDataset};
