use crate::api::payload::PredictPayload;
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use crate::ml::{ModelInfo, ModelMetadata, PredictionOutcome, RetrainOverrides, Score, ScoreSummary};
use crate::preprocessing::{PredictionInput, RawRecord};
use axum::{
    body::Bytes,
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Rows of an uploaded file echoed back in the response
pub const FILE_ECHO_LIMIT: usize = 1000;

/// Welcome banner
pub async fn root() -> &'static str {
    "Welcome to Soil Productivity Prediction API!"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: state.service_name.to_string(),
        model_loaded: state.service.is_model_loaded(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: String,
    pub model_loaded: bool,
    pub version: &'static str,
}

/// Score a single record, a batch, or an uploaded file
pub async fn predict(
    State(state): State<AppState>,
    PredictPayload(input): PredictPayload,
) -> Result<Json<serde_json::Value>> {
    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.predict(input))
        .await
        .map_err(|e| AppError::Internal(format!("prediction task failed: {}", e)))??;

    let body = match render_prediction(outcome) {
        PredictionResponse::Single(body) => serde_json::to_value(body)?,
        PredictionResponse::Batch(body) => serde_json::to_value(body)?,
        PredictionResponse::File(body) => serde_json::to_value(body)?,
    };

    Ok(Json(body))
}

#[derive(Debug, Serialize)]
pub struct SinglePredictionResponse {
    pub message: &'static str,
    pub input: RawRecord,
    #[serde(flatten)]
    pub score: Score,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_soil_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoredRecord {
    pub input: RawRecord,
    #[serde(flatten)]
    pub score: Score,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictionResponse {
    pub message: &'static str,
    pub results: Vec<ScoredRecord>,
    pub count: usize,
    pub average_productivity: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_soil_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FilePredictionResponse {
    pub message: &'static str,
    /// Leading rows with their scores appended
    pub data: Vec<RawRecord>,
    pub total_records: usize,
    pub average_productivity: f64,
    pub min_productivity: f64,
    pub max_productivity: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_soil_types: Vec<String>,
}

#[derive(Debug)]
pub enum PredictionResponse {
    Single(SinglePredictionResponse),
    Batch(BatchPredictionResponse),
    File(FilePredictionResponse),
}

/// Shape a prediction outcome the way its input arrived.
pub fn render_prediction(outcome: PredictionOutcome) -> PredictionResponse {
    let PredictionOutcome {
        input,
        scores,
        unrecognized_soil_types,
    } = outcome;
    let summary = ScoreSummary::of(&scores);
    let average = summary.map(|s| s.average).unwrap_or_default();

    match input {
        PredictionInput::Single(record) => PredictionResponse::Single(SinglePredictionResponse {
            message: "Prediction successful",
            input: record,
            score: scores.first().copied().unwrap_or_else(|| Score::from_raw(0.0)),
            unrecognized_soil_types,
        }),
        PredictionInput::Batch(records) => PredictionResponse::Batch(BatchPredictionResponse {
            message: "Batch prediction successful",
            count: records.len(),
            results: records
                .into_iter()
                .zip(scores)
                .map(|(input, score)| ScoredRecord { input, score })
                .collect(),
            average_productivity: average,
            unrecognized_soil_types,
        }),
        PredictionInput::Table(table) => {
            let data = scores
                .iter()
                .take(FILE_ECHO_LIMIT)
                .enumerate()
                .filter_map(|(idx, score)| {
                    let mut row = table.row_record(idx)?;
                    row.insert("productivity_score".into(), json!(score.productivity_score));
                    row.insert(
                        "productivity_level".into(),
                        json!(score.productivity_level.to_string()),
                    );
                    Some(row)
                })
                .collect();

            PredictionResponse::File(FilePredictionResponse {
                message: "File processed successfully",
                data,
                total_records: table.len(),
                average_productivity: average,
                min_productivity: summary.map(|s| s.min).unwrap_or_default(),
                max_productivity: summary.map(|s| s.max).unwrap_or_default(),
                unrecognized_soil_types,
            })
        }
    }
}

/// Soil types the loaded model knows, as a bare JSON array
pub async fn soil_types(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.service.soil_types())
}

/// Describe the installed model
pub async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>> {
    Ok(Json(state.service.model_info()?))
}

/// Retrain, persist and install a new model.
///
/// The body is optional; when present it may override `n_samples`,
/// `n_trees`, `max_depth` and `seed`.
pub async fn retrain_model(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RetrainResponse>> {
    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        RetrainOverrides::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid retrain options: {}", e)))?
    };

    let metadata = state.service.retrain(overrides).await?;

    Ok(Json(RetrainResponse {
        message: "Model retrained successfully",
        metadata,
    }))
}

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub message: &'static str,
    pub metadata: ModelMetadata,
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ProductivityLevel;
    use crate::preprocessing::Table;

    fn scores(raw: &[f64]) -> Vec<Score> {
        raw.iter().map(|&r| Score::from_raw(r)).collect()
    }

    #[test]
    fn test_single_response_shape() {
        let mut record = RawRecord::new();
        record.insert("nitrogen".into(), json!(10));

        let response = render_prediction(PredictionOutcome {
            input: PredictionInput::Single(record),
            scores: scores(&[72.5]),
            unrecognized_soil_types: vec![],
        });
        let PredictionResponse::Single(body) = response else {
            panic!("expected single response");
        };
        let json = serde_json::to_value(body).unwrap();

        assert_eq!(json["message"], "Prediction successful");
        assert_eq!(json["productivity_score"], 72.5);
        assert_eq!(json["productivity_level"], "High");
        assert_eq!(json["input"]["nitrogen"], 10);
        assert!(json.get("unrecognized_soil_types").is_none());
    }

    #[test]
    fn test_batch_response_average() {
        let response = render_prediction(PredictionOutcome {
            input: PredictionInput::Batch(vec![RawRecord::new(), RawRecord::new()]),
            scores: scores(&[20.0, 60.0]),
            unrecognized_soil_types: vec!["Peat".into()],
        });
        let PredictionResponse::Batch(body) = response else {
            panic!("expected batch response");
        };

        assert_eq!(body.count, 2);
        assert_eq!(body.average_productivity, 40.0);
        assert_eq!(body.results[1].score.productivity_level, ProductivityLevel::Medium);
        assert_eq!(body.unrecognized_soil_types, vec!["Peat".to_string()]);
    }

    #[test]
    fn test_file_response_echo_is_capped() {
        let rows = (0..1005).map(|i| vec![json!(i)]).collect();
        let table = Table::with_rows(vec!["nitrogen".into()], rows);
        let raw: Vec<f64> = (0..1005).map(|i| (i % 100) as f64).collect();

        let response = render_prediction(PredictionOutcome {
            input: PredictionInput::Table(table),
            scores: scores(&raw),
            unrecognized_soil_types: vec![],
        });
        let PredictionResponse::File(body) = response else {
            panic!("expected file response");
        };

        assert_eq!(body.data.len(), FILE_ECHO_LIMIT);
        assert_eq!(body.total_records, 1005);
        assert_eq!(body.min_productivity, 0.0);
        assert_eq!(body.max_productivity, 99.0);
        assert_eq!(body.data[3]["productivity_score"], 3.0);
        assert_eq!(body.data[3]["productivity_level"], "Low");
    }
}
