use crate::config::ModelConfig;
use crate::error::{AppError, Result};
use crate::metrics::{
    MODEL_TRAININGS_TOTAL, PREDICTED_RECORDS_TOTAL, PREDICTIONS_TOTAL, PREDICTION_DURATION_SECONDS,
    PREDICTION_FAILURES_TOTAL, PRODUCTIVITY_SCORES,
};
use crate::ml::models::{ModelMetadata, TrainingParams};
use crate::ml::persistence::{load_model, save_model};
use crate::ml::regressor::ProductivityModel;
use crate::ml::registry::{ModelRegistry, ModelSnapshot};
use crate::ml::scoring::Score;
use crate::ml::training::{load_dataset, train_random_forest};
use crate::preprocessing::{align, normalize, PredictionInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Soil types reported when no model is loaded.
pub const DEFAULT_SOIL_TYPES: [&str; 5] = ["Loam", "Clay", "Sandy", "Silt", "Peat"];

/// Result of scoring one request.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    /// The input after alias normalization
    pub input: PredictionInput,

    /// One score per record, in input order
    pub scores: Vec<Score>,

    /// Soil labels the model was not trained on
    pub unrecognized_soil_types: Vec<String>,
}

/// Per-request overrides for a retrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrainOverrides {
    pub n_samples: Option<usize>,
    pub n_trees: Option<usize>,
    pub max_depth: Option<u16>,
    pub seed: Option<u64>,
}

impl RetrainOverrides {
    pub fn apply(&self, mut params: TrainingParams) -> TrainingParams {
        if let Some(n_samples) = self.n_samples {
            params.n_samples = n_samples;
        }
        if let Some(n_trees) = self.n_trees {
            params.n_trees = n_trees;
        }
        if let Some(max_depth) = self.max_depth {
            params.max_depth = max_depth;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        params
    }
}

/// Description of the installed model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub n_estimators: usize,
    pub max_depth: u16,
    pub model_path: String,
    pub model_exists: bool,
    pub feature_order: Vec<String>,
    pub soil_types: Vec<String>,
    pub metadata: ModelMetadata,
}

/// Prediction service: owns the model snapshot, scores inputs, retrains.
pub struct PredictionService {
    /// Configuration
    config: ModelConfig,

    registry: ModelRegistry,

    /// Held for the whole of a retrain so runs never overlap
    retrain_lock: Mutex<()>,
}

impl PredictionService {
    /// Create a service with no model installed
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            registry: ModelRegistry::new(),
            retrain_lock: Mutex::new(()),
        }
    }

    /// Create a service around an already trained model
    pub fn with_model(config: ModelConfig, model: ModelSnapshot) -> Self {
        Self {
            config,
            registry: ModelRegistry::with_model(model),
            retrain_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Load the configured artifact, or train one when allowed.
    ///
    /// Failing to obtain a model is not fatal: the service keeps running and
    /// prediction requests answer with `MODEL_NOT_READY`.
    pub async fn initialize(&self) -> Result<()> {
        let path = self.config.path.clone();

        let loaded = tokio::task::spawn_blocking(move || load_model(&path))
            .await
            .map_err(|e| AppError::Internal(format!("model loading task failed: {}", e)))?;

        match loaded {
            Ok(model) => {
                info!(
                    path = %self.config.path.display(),
                    model_id = %model.metadata().id,
                    "Loaded prediction model"
                );
                self.registry.install(Arc::new(model));
                return Ok(());
            }
            Err(e) => warn!(
                path = %self.config.path.display(),
                error = %e,
                "No usable model artifact"
            ),
        }

        if !self.config.train_if_missing {
            warn!("Training at startup disabled; predictions unavailable until retrain");
            return Ok(());
        }

        if let Err(e) = self.retrain(RetrainOverrides::default()).await {
            error!(error = %e, "Initial training failed; continuing without a model");
        }

        Ok(())
    }

    /// Normalize, align and score an input against the current snapshot.
    pub fn predict(&self, input: PredictionInput) -> Result<PredictionOutcome> {
        let kind = input.kind();
        let start = Instant::now();

        let result = self.score(input);

        match &result {
            Ok(outcome) => {
                PREDICTIONS_TOTAL.with_label_values(&[kind]).inc();
                PREDICTED_RECORDS_TOTAL.inc_by(outcome.scores.len() as u64);
                PREDICTION_DURATION_SECONDS
                    .with_label_values(&[kind])
                    .observe(start.elapsed().as_secs_f64());
                for score in &outcome.scores {
                    PRODUCTIVITY_SCORES.observe(score.productivity_score);
                }
                debug!(
                    input_kind = kind,
                    records = outcome.scores.len(),
                    unrecognized = outcome.unrecognized_soil_types.len(),
                    "Prediction completed"
                );
            }
            Err(e) => {
                let reason = match e {
                    AppError::Alignment(align_error) => align_error.kind(),
                    AppError::Validation(_) => "validation",
                    _ => "internal",
                };
                PREDICTION_FAILURES_TOTAL.with_label_values(&[reason]).inc();
            }
        }

        result
    }

    fn score(&self, input: PredictionInput) -> Result<PredictionOutcome> {
        if input.is_empty() {
            return Err(AppError::Validation("No records to predict".to_string()));
        }

        let input = normalize(input);
        let snapshot = self.registry.current();
        let model = snapshot.as_deref();

        let aligned = align(&input, model.map(|m| m.schema()))?;
        let model = model.ok_or_else(|| AppError::ModelNotReady("no model loaded".to_string()))?;

        let raw = model.predict(&aligned.features)?;
        if raw.len() != aligned.n_records() {
            return Err(AppError::Internal(format!(
                "model returned {} scores for {} records",
                raw.len(),
                aligned.n_records()
            )));
        }

        Ok(PredictionOutcome {
            input,
            scores: raw.into_iter().map(Score::from_raw).collect(),
            unrecognized_soil_types: aligned.unrecognized_soil_types,
        })
    }

    /// Train a new model, persist it, and install it.
    ///
    /// Concurrent calls queue behind each other. The current snapshot keeps
    /// serving until the new one is installed; on failure it stays in place.
    pub async fn retrain(&self, overrides: RetrainOverrides) -> Result<ModelMetadata> {
        let _guard = self.retrain_lock.lock().await;

        let params = overrides.apply(self.config.training_params());
        params.validate()?;

        let path = self.config.path.clone();
        let training_data = self.config.training_data_path.clone();
        let started = Instant::now();

        let trained = tokio::task::spawn_blocking(move || {
            let dataset = load_dataset(&params, training_data.as_deref())?;
            let model = train_random_forest(&dataset, &params)?;
            save_model(&model, &path)?;
            Ok::<_, AppError>(model)
        })
        .await
        .map_err(|e| AppError::Internal(format!("training task failed: {}", e)))?;

        match trained {
            Ok(model) => {
                let metadata = model.metadata().clone();
                self.registry.install(Arc::new(model));
                MODEL_TRAININGS_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    model_id = %metadata.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Installed retrained model"
                );
                Ok(metadata)
            }
            Err(e) => {
                MODEL_TRAININGS_TOTAL.with_label_values(&["failure"]).inc();
                error!(error = %e, "Retraining failed; keeping the current model");
                Err(e)
            }
        }
    }

    /// Describe the installed model
    pub fn model_info(&self) -> Result<ModelInfo> {
        let model = self
            .registry
            .current()
            .ok_or_else(|| AppError::ModelNotReady("no model loaded".to_string()))?;
        let metadata = model.metadata().clone();

        Ok(ModelInfo {
            model_type: metadata.model_type.to_string(),
            n_estimators: metadata.n_estimators,
            max_depth: metadata.max_depth,
            model_path: self.config.path.display().to_string(),
            model_exists: self.config.path.exists(),
            feature_order: model.schema().feature_order().to_vec(),
            soil_types: model.schema().soil_categories().to_vec(),
            metadata,
        })
    }

    pub fn is_model_loaded(&self) -> bool {
        self.registry.is_loaded()
    }

    /// Trained soil-type categories, or the default list without a model.
    pub fn soil_types(&self) -> Vec<String> {
        match self.registry.current() {
            Some(model) => model.schema().soil_categories().to_vec(),
            None => DEFAULT_SOIL_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::{ModelType, TrainingSource};
    use crate::preprocessing::{RawRecord, TrainedSchema, NUMERIC_FEATURES};
    use ndarray::Array2;
    use serde_json::json;
    use std::collections::HashMap;

    /// Scores every row as the sum of its indicator columns times 100.
    struct IndicatorModel {
        schema: TrainedSchema,
        metadata: ModelMetadata,
    }

    impl IndicatorModel {
        fn new() -> Self {
            let schema = TrainedSchema::canonical(vec!["Loam".to_string()]).unwrap();
            Self {
                metadata: ModelMetadata {
                    id: uuid::Uuid::new_v4(),
                    model_type: ModelType::RandomForest,
                    trained_at: chrono::Utc::now(),
                    n_training_samples: 0,
                    n_features: schema.width(),
                    n_estimators: 1,
                    max_depth: 1,
                    test_metrics: None,
                    source: TrainingSource::Synthetic {
                        n_samples: 0,
                        seed: 0,
                    },
                    hyperparameters: HashMap::new(),
                },
                schema,
            }
        }
    }

    impl ProductivityModel for IndicatorModel {
        fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
            Ok(features.rows().into_iter().map(|r| r[16] * 150.0).collect())
        }

        fn schema(&self) -> &TrainedSchema {
            &self.schema
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }
    }

    fn record(soil: Option<&str>) -> RawRecord {
        let mut record: RawRecord = NUMERIC_FEATURES
            .iter()
            .map(|name| (name.to_string(), json!(1)))
            .collect();
        if let Some(soil) = soil {
            record.insert("Soil Type".into(), json!(soil));
        }
        record
    }

    fn service_with_model() -> PredictionService {
        PredictionService::with_model(ModelConfig::default(), Arc::new(IndicatorModel::new()))
    }

    #[test]
    fn test_predict_without_model_is_not_ready() {
        let service = PredictionService::new(ModelConfig::default());
        let err = service
            .predict(PredictionInput::Single(record(Some("Loam"))))
            .unwrap_err();
        assert_eq!(err.error_code(), "MODEL_NOT_READY");
    }

    #[test]
    fn test_predict_clamps_and_normalizes() {
        let service = service_with_model();
        let outcome = service
            .predict(PredictionInput::Batch(vec![record(Some("Loam")), record(Some("Peat"))]))
            .unwrap();

        assert_eq!(outcome.scores[0].productivity_score, 100.0);
        assert_eq!(outcome.scores[1].productivity_score, 0.0);
        assert_eq!(outcome.unrecognized_soil_types, vec!["Peat".to_string()]);

        match outcome.input {
            PredictionInput::Batch(records) => assert!(records[0].contains_key("soil_type")),
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let service = service_with_model();
        let err = service.predict(PredictionInput::Batch(vec![])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_soil_types_fall_back_to_defaults() {
        let service = PredictionService::new(ModelConfig::default());
        assert_eq!(service.soil_types(), DEFAULT_SOIL_TYPES.to_vec());

        let service = service_with_model();
        assert_eq!(service.soil_types(), vec!["Loam".to_string()]);
    }

    #[test]
    fn test_model_info_requires_model() {
        let service = PredictionService::new(ModelConfig::default());
        assert!(matches!(service.model_info(), Err(AppError::ModelNotReady(_))));

        let info = service_with_model().model_info().unwrap();
        assert_eq!(info.model_type, "RandomForestRegressor");
        assert_eq!(info.feature_order.len(), 17);
    }

    #[test]
    fn test_overrides_apply() {
        let params = RetrainOverrides {
            n_trees: Some(3),
            seed: Some(1),
            ..RetrainOverrides::default()
        }
        .apply(TrainingParams::default());

        assert_eq!(params.n_trees, 3);
        assert_eq!(params.seed, 1);
        assert_eq!(params.max_depth, 10);
    }

    #[tokio::test]
    async fn test_retrain_installs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            path: dir.path().join("model.bin"),
            n_samples: 60,
            n_trees: 3,
            max_depth: 4,
            ..ModelConfig::default()
        };
        let service = PredictionService::new(config);
        assert!(!service.is_model_loaded());

        let metadata = service.retrain(RetrainOverrides::default()).await.unwrap();

        assert!(service.is_model_loaded());
        assert_eq!(metadata.n_estimators, 3);
        assert!(service.model_info().unwrap().model_exists);
    }

    #[tokio::test]
    async fn test_invalid_overrides_keep_current_model() {
        let service = service_with_model();
        let err = service
            .retrain(RetrainOverrides {
                n_trees: Some(0),
                ..RetrainOverrides::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.soil_types(), vec!["Loam".to_string()]);
    }

    #[tokio::test]
    async fn test_initialize_without_training_leaves_service_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            path: dir.path().join("missing.bin"),
            train_if_missing: false,
            ..ModelConfig::default()
        };
        let service = PredictionService::new(config);

        service.initialize().await.unwrap();
        assert!(!service.is_model_loaded());
    }
}
