use crate::metrics::MODEL_LOADED;
use crate::ml::regressor::ProductivityModel;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to an installed model.
pub type ModelSnapshot = Arc<dyn ProductivityModel>;

/// Holds the current model snapshot.
///
/// Readers clone the `Arc` and release the lock immediately, so a request
/// keeps using the snapshot it started with even if a retrain installs a new
/// one meanwhile. Installation swaps the whole snapshot at once.
#[derive(Default)]
pub struct ModelRegistry {
    current: RwLock<Option<ModelSnapshot>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: ModelSnapshot) -> Self {
        let registry = Self::new();
        registry.install(model);
        registry
    }

    /// The installed snapshot, if any.
    pub fn current(&self) -> Option<ModelSnapshot> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replace the snapshot, returning the previous one.
    pub fn install(&self, model: ModelSnapshot) -> Option<ModelSnapshot> {
        let previous = self.current.write().replace(model);
        MODEL_LOADED.set(1.0);
        previous
    }

    /// Remove the snapshot.
    pub fn clear(&self) -> Option<ModelSnapshot> {
        let previous = self.current.write().take();
        MODEL_LOADED.set(0.0);
        previous
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
