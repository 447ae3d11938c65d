//! Preferences service
//!
//! String key/value preferences persisted as a JSON file in the app data
//! directory. The map is loaded once when the service is opened and written
//! back on every change. Clones share the same in-memory map, so one
//! instance constructed at startup can be handed to every consumer.

use crate::config::PREFERENCES_FILE_NAME;
use crate::error::{AppError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Service for reading and writing preferences
#[derive(Clone)]
pub struct PreferenceService {
    path: PathBuf,
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl PreferenceService {
    /// Open the preference file in `app_data_dir`, starting empty if it
    /// does not exist yet.
    pub async fn open(app_data_dir: &Path) -> Result<Self> {
        let path = app_data_dir.join(PREFERENCES_FILE_NAME);

        let values = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str(&content)
                .map_err(|e| AppError::Generic(format!("Failed to parse preferences: {}", e)))?
        } else {
            tracing::info!("Preferences file not found, starting with defaults");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Arc::new(RwLock::new(values)),
        })
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.values.read().await.contains_key(key)
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.into());
        self.save(&values).await?;

        tracing::debug!("Set preference: {}", key);
        Ok(())
    }

    /// Remove a preference. Returns whether it was set.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values.write().await;
        let removed = values.remove(key).is_some();
        if removed {
            self.save(&values).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        let mut values = self.values.write().await;
        values.clear();
        self.save(&values).await
    }

    /// Read a numeric preference, treating missing or malformed values as 0
    pub async fn get_u64(&self, key: &str) -> u64 {
        self.get(key)
            .await
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(values)
            .map_err(|e| AppError::Generic(format!("Failed to serialize preferences: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}
