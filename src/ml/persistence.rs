//! Model artifacts on disk.
//!
//! An artifact is a bincode-encoded envelope holding a format version and the
//! trained model (metadata, feature order, forest). Writes go to a sibling
//! temporary file which is then renamed over the target.

use crate::error::{AppError, Result};
use crate::ml::regressor::RandomForestModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bumped whenever the artifact layout changes.
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    model: &'a RandomForestModel,
}

#[derive(Deserialize)]
struct Artifact {
    version: u32,
    model: RandomForestModel,
}

/// Write `model` to `path`, creating parent directories as needed.
pub fn save_model(model: &RandomForestModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let bytes = bincode::serialize(&ArtifactRef {
        version: ARTIFACT_VERSION,
        model,
    })?;

    let tmp = temporary_path(path);
    fs::write(&tmp, &bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!(path = %path.display(), bytes = bytes.len(), "Model artifact written");
    Ok(())
}

/// Read a model artifact.
pub fn load_model(path: &Path) -> Result<RandomForestModel> {
    let bytes = fs::read(path)?;
    let artifact: Artifact = bincode::deserialize(&bytes)
        .map_err(|e| AppError::Training(format!("unreadable model artifact: {}", e)))?;

    if artifact.version != ARTIFACT_VERSION {
        return Err(AppError::Training(format!(
            "model artifact version {} is not supported (expected {})",
            artifact.version, ARTIFACT_VERSION
        )));
    }

    debug!(path = %path.display(), "Model artifact read");
    Ok(artifact.model)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "model".into());
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_path_is_sibling() {
        let tmp = temporary_path(Path::new("/data/models/soil_model.bin"));
        assert_eq!(tmp.parent(), Some(Path::new("/data/models")));
        let name = tmp.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("soil_model.bin."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_load_garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bin");
        fs::write(&path, b"definitely not a model").unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, AppError::Training(_)));
    }
}
