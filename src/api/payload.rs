//! Prediction request decoding.
//!
//! `/api/predict` accepts three shapes: a JSON object (single record), a JSON
//! array of objects (batch), or a multipart upload whose `file` field holds a
//! CSV or spreadsheet. The shape is decided here, once, and carried on as a
//! [`PredictionInput`].

use crate::error::AppError;
use crate::ingest::{read_table, TabularFormat, UNSUPPORTED_FILE_MESSAGE};
use crate::preprocessing::{PredictionInput, RawRecord};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::Value;

/// Error text when a request carries neither JSON nor an upload.
pub const NO_INPUT_MESSAGE: &str = "No valid input provided. Send JSON data or upload a file.";

/// Name of the multipart field holding the upload.
pub const FILE_FIELD: &str = "file";

/// A decoded prediction request.
#[derive(Debug)]
pub struct PredictPayload(pub PredictionInput);

#[async_trait]
impl<S> FromRequest<S> for PredictPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            return read_upload(multipart).await.map(PredictPayload);
        }

        if content_type.contains("json") {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            let value: Value = serde_json::from_slice(&body)
                .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?;
            return input_from_json(value).map(PredictPayload);
        }

        Err(AppError::Validation(NO_INPUT_MESSAGE.to_string()))
    }
}

/// Classify a JSON body: object → single record, array of objects → batch.
pub fn input_from_json(value: Value) -> Result<PredictionInput, AppError> {
    match value {
        Value::Object(record) => Ok(PredictionInput::Single(record)),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(AppError::Validation(format!(
                    "Batch item {} is not a JSON object",
                    idx
                ))),
            })
            .collect::<Result<Vec<RawRecord>, _>>()
            .map(PredictionInput::Batch),
        _ => Err(AppError::Validation(NO_INPUT_MESSAGE.to_string())),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<PredictionInput, AppError> {
    let upload_error = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("No selected file".to_string()))?;

        let format = TabularFormat::from_filename(&file_name)
            .ok_or_else(|| AppError::UnsupportedFile(UNSUPPORTED_FILE_MESSAGE.to_string()))?;

        let data = field.bytes().await.map_err(upload_error)?;
        if data.is_empty() {
            return Err(AppError::Validation("The uploaded file is empty".to_string()));
        }

        tracing::info!(file_name = %file_name, bytes = data.len(), format = %format, "Received upload");

        let table = tokio::task::spawn_blocking(move || read_table(&data, format))
            .await
            .map_err(|e| AppError::Internal(format!("file decoding task failed: {}", e)))??;

        return Ok(PredictionInput::Table(table));
    }

    Err(AppError::Validation(NO_INPUT_MESSAGE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_is_single() {
        let input = input_from_json(json!({"N": 1})).unwrap();
        assert!(matches!(input, PredictionInput::Single(_)));
    }

    #[test]
    fn test_array_is_batch() {
        let input = input_from_json(json!([{"N": 1}, {"N": 2}])).unwrap();
        assert_eq!(input.len(), 2);
        assert_eq!(input.kind(), "batch");
    }

    #[test]
    fn test_array_of_scalars_rejected() {
        let err = input_from_json(json!([{"N": 1}, 3])).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Batch item 1 is not a JSON object");
    }

    #[test]
    fn test_scalar_rejected() {
        let err = input_from_json(json!("hello")).unwrap_err();
        assert!(err.to_string().contains(NO_INPUT_MESSAGE));
    }
}
