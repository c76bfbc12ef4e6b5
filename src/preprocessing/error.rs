use thiserror::Error;

/// Reasons alignment can refuse an input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    /// Required numeric features are absent. Lists every absent field.
    #[error("{}", describe_missing(.record, .fields))]
    MissingFeature {
        record: Option<usize>,
        fields: Vec<String>,
    },

    /// Required numeric features are present but null or not numeric.
    #[error("{}", describe_invalid(.records, .fields))]
    InvalidValue {
        records: Vec<usize>,
        fields: Vec<String>,
    },

    /// No trained schema to align against.
    #[error("Prediction model not ready: {0}")]
    ModelNotReady(String),
}

impl AlignError {
    /// True for defects in the submitted data, false for service state.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AlignError::ModelNotReady(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AlignError::MissingFeature { .. } => "missing_feature",
            AlignError::InvalidValue { .. } => "invalid_value",
            AlignError::ModelNotReady(_) => "model_not_ready",
        }
    }
}

fn describe_missing(record: &Option<usize>, fields: &[String]) -> String {
    match record {
        Some(idx) => format!(
            "Missing required features in record {}: {}",
            idx,
            fields.join(", ")
        ),
        None => format!("Missing required features: {}", fields.join(", ")),
    }
}

fn describe_invalid(records: &[usize], fields: &[String]) -> String {
    let mut message = format!(
        "Input contains invalid or missing values in: {}",
        fields.join(", ")
    );
    if !records.is_empty() {
        let rows: Vec<String> = records.iter().map(|r| r.to_string()).collect();
        message.push_str(&format!(" (records {})", rows.join(", ")));
    }
    message
}
