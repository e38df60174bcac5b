use std::sync::Arc;

use anyhow::{Context, Result};

use crate::scripts::{DeletedScript, LoadedScript, SavedScript, ScriptEntry, ScriptStore};

/// Service for script storage operations
///
/// Store errors are kept as the `anyhow` root cause so callers can
/// downcast to [`ScriptStoreError`](crate::scripts::ScriptStoreError).
#[derive(Clone)]
pub struct ScriptService {
    store: Arc<ScriptStore>,
}

impl ScriptService {
    pub fn new(store: Arc<ScriptStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ScriptStore> {
        &self.store
    }

    pub async fn save(&self, filename: &str, code: &str) -> Result<SavedScript> {
        let store = Arc::clone(&self.store);
        let (filename, code) = (filename.to_string(), code.to_string());
        tokio::task::spawn_blocking(move || store.save(&filename, &code))
            .await
            .context("Save task failed to complete")?
            .map_err(Into::into)
    }

    pub async fn load(&self, filename: &str) -> Result<LoadedScript> {
        let store = Arc::clone(&self.store);
        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || store.load(&filename))
            .await
            .context("Load task failed to complete")?
            .map_err(Into::into)
    }

    pub async fn list(&self) -> Result<Vec<ScriptEntry>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.list())
            .await
            .context("List task failed to complete")?
            .map_err(Into::into)
    }

    pub async fn delete(&self, filename: &str) -> Result<DeletedScript> {
        let store = Arc::clone(&self.store);
        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || store.delete(&filename))
            .await
            .context("Delete task failed to complete")?
            .map_err(Into::into)
    }
}
