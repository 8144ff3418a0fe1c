//! JSON-file settings store
//!
//! Persists the engine's key-value settings as one JSON document under the
//! platform config directory. Writes go through to disk immediately; the
//! settings volume here is a handful of keys, so durability beats batching.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Settings store backed by a single JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Open (or create) the store at an explicit path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BridgeError::OperationFailed(format!("settings file is corrupt: {}", e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the store at the platform default location for `app_name`.
    pub async fn open_default(app_name: &str) -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| BridgeError::NotAvailable("no config directory".to_string()))?;
        let dir = base.join(app_name);
        tokio::fs::create_dir_all(&dir).await?;
        Self::open(dir.join("settings.json")).await
    }

    /// The file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value);
        self.flush(&values).await
    }

    async fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().await.get(key).cloned()
    }

    async fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_vec_pretty(&Value::Object(values.clone()))
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), keys = values.len(), "settings flushed");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string())).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_value(key)
            .await
            .and_then(|v| v.as_str().map(String::from)))
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, Value::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get_value(key).await.and_then(|v| v.as_bool()))
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, Value::from(value)).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get_value(key).await.and_then(|v| v.as_i64()))
    }

    async fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        self.set_value(key, Value::from(value)).await
    }

    async fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        Ok(self.get_value(key).await.and_then(|v| v.as_f64()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        values.remove(key);
        self.flush(&values).await
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().await.contains_key(key))
    }
}
