//! In-process collection store with listener semantics.
//!
//! This is the stand-in for the hosted realtime database: a write
//! replaces the value at a path and is broadcast to every subscriber of
//! that path, the writer included. It backs the `memory` configuration
//! and the sync tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::traits::CollectionStore;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Default)]
pub struct MemoryCollectionStore {
    values: Mutex<HashMap<String, Value>>,
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
    writes: AtomicUsize,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of writes accepted, across all paths. Used by tests
    /// to assert debounce coalescing.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
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
impl CollectionStore for MemoryCollectionStore {
    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(path.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        // Echo to every subscriber; a send error just means nobody is
        // listening right now.
        let _ = self.sender_for(path).send(value);
        debug!("Wrote snapshot to {}", path);
        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Value> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn subscribe(&self, path: &str) -> Result<broadcast::Receiver<Value>> {
        Ok(self.sender_for(path).subscribe())
    }

    async fn unsubscribe(&self, path: &str) -> Result<()> {
        self.channels.lock().unwrap().remove(path);
        debug!("Dropped subscription channel for {}", path);
        Ok(())
    }
}
