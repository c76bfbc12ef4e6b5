//! Input normalization and feature alignment.
//!
//! Raw input passes through [`normalize`] (alias renaming, never fails) and
//! then [`align`] (presence, coercion, soil-type expansion, trained column
//! order) before it reaches a model.

pub mod aliases;
pub mod aligner;
pub mod error;
pub mod normalizer;
pub mod record;
pub mod schema;

pub use aliases::{canonical_name, NUMERIC_FEATURES, PRODUCTIVITY_SCORE, SOIL_TYPE};
pub use aligner::{align, AlignedBatch, FeatureAligner};
pub use error::AlignError;
pub use normalizer::{normalize, normalize_record, normalize_table};
pub use record::{PredictionInput, RawRecord, Table};
pub use schema::TrainedSchema;
