//! JSON-file preference store for the first-launch flag and remembered
//! credentials.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use serde_json::Value;
use tracing::warn;

use crate::storage::traits::PreferenceStore;

pub struct JsonPreferenceStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Value>>,
}

impl JsonPreferenceStore {
    /// Open (or create) the preference file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Preference file {} unreadable, starting fresh: {}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, Value::String(value.to_string()))
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.entries.lock().unwrap().get(key).and_then(Value::as_bool)
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, Value::Bool(value))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.persist(&entries)
    }
}
