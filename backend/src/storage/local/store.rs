//! File-backed collection store.
//!
//! Each collection path maps to a JSON document under the data
//! directory (`users/u1/todos` -> `<data_dir>/users/u1/todos.json`).
//! Writes go to a temp file first and are renamed into place so a
//! crashed write never leaves a half-written collection behind. Change
//! notification works exactly like the listener-based backend: every
//! write is echoed to the path's subscribers.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::storage::traits::CollectionStore;

const CHANNEL_CAPACITY: usize = 32;

pub struct LocalFileStore {
    base_directory: PathBuf,
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
}

impl LocalFileStore {
    /// Create a file store rooted at `base_directory`, creating the
    /// directory if needed.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        info!("Local file store rooted at {}", base_path.display());

        Ok(Self {
            base_directory: base_path,
            channels: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Resolve a collection path to its backing file. Path segments
    /// must be plain names; anything traversal-shaped is rejected.
    fn file_for(&self, path: &str) -> Result<PathBuf> {
        let mut file = self.base_directory.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(anyhow::anyhow!("Invalid collection path: {}", path));
            }
            file.push(segment);
        }
        file.set_extension("json");
        Ok(file)
    }

    fn sender_for(&self, path: &str) -> broadcast::Sender<Value> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(path.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl CollectionStore for LocalFileStore {
    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let file_path = self.file_for(path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = file_path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(&value)?)?;
        fs::rename(&temp_path, &file_path)?;
        debug!("Wrote {} to {}", path, file_path.display());

        let _ = self.sender_for(path).send(value);
        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Value> {
        let file_path = self.file_for(path)?;
        if !file_path.exists() {
            return Ok(Value::Null);
        }

        let raw = fs::read_to_string(&file_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn subscribe(&self, path: &str) -> Result<broadcast::Receiver<Value>> {
        Ok(self.sender_for(path).subscribe())
    }

    async fn unsubscribe(&self, path: &str) -> Result<()> {
        self.channels.lock().unwrap().remove(path);
        Ok(())
    }
}
