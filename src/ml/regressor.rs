use crate::error::{AppError, Result};
use crate::ml::models::{ModelMetadata, TrainingParams};
use crate::preprocessing::TrainedSchema;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// A trained productivity regressor together with the layout it was trained on.
pub trait ProductivityModel: Send + Sync {
    /// Raw scores, one per row. Rows must follow [`ProductivityModel::schema`].
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>>;

    /// Trained feature order and soil-type categories
    fn schema(&self) -> &TrainedSchema;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;
}

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest regressor backed by smartcore
#[derive(Serialize, Deserialize)]
pub struct RandomForestModel {
    metadata: ModelMetadata,
    schema: TrainedSchema,
    forest: Forest,
}

impl std::fmt::Debug for RandomForestModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomForestModel")
            .field("metadata", &self.metadata)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl RandomForestModel {
    /// Fit a forest on rows laid out per `schema`.
    ///
    /// `metadata` is completed by the caller once evaluation has run.
    pub fn fit(
        features: &Array2<f64>,
        targets: &[f64],
        schema: TrainedSchema,
        params: &TrainingParams,
        metadata: ModelMetadata,
    ) -> Result<Self> {
        if features.nrows() != targets.len() {
            return Err(AppError::Training(format!(
                "{} feature rows but {} targets",
                features.nrows(),
                targets.len()
            )));
        }
        if features.ncols() != schema.width() {
            return Err(AppError::Training(format!(
                "feature matrix has {} columns, layout expects {}",
                features.ncols(),
                schema.width()
            )));
        }
        if features.nrows() < 2 {
            return Err(AppError::Training(
                "at least two training rows are required".to_string(),
            ));
        }

        let n_trees = params
            .n_trees
            .try_into()
            .map_err(|_| AppError::Training(format!("too many trees: {}", params.n_trees)))?;

        let parameters = RandomForestRegressorParameters::default()
            .with_n_trees(n_trees)
            .with_max_depth(params.max_depth)
            .with_min_samples_split(params.min_samples_split)
            .with_seed(params.seed);

        let x = ndarray_to_densematrix(features);
        let y = targets.to_vec();

        let forest = RandomForestRegressor::fit(&x, &y, parameters)
            .map_err(|e| AppError::Training(format!("Failed to fit random forest: {}", e)))?;

        Ok(Self {
            metadata,
            schema,
            forest,
        })
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }
}

impl ProductivityModel for RandomForestModel {
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        if features.ncols() != self.schema.width() {
            return Err(AppError::Internal(format!(
                "feature matrix has {} columns, model expects {}",
                features.ncols(),
                self.schema.width()
            )));
        }
        if features.nrows() == 0 {
            return Ok(Vec::new());
        }

        let x = ndarray_to_densematrix(features);
        self.forest
            .predict(&x)
            .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))
    }

    fn schema(&self) -> &TrainedSchema {
        &self.schema
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Row-major copy of an ndarray matrix into smartcore's dense matrix.
pub fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let (rows, cols) = arr.dim();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(rows, cols, data, false)
}
