//! Soil productivity prediction service.
//!
//! Scores soil samples on a 0-100 productivity scale with a random forest
//! regressor. Inputs arrive as single JSON records, JSON batches, or
//! uploaded CSV/Excel tables whose column names may use any of the known
//! aliases; they are normalized to canonical feature names and aligned to
//! the exact column layout the model was trained on before scoring.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod ml;
pub mod preprocessing;

pub use config::Config;
pub use error::{AppError, Result};
