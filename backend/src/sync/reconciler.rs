//! # Sync Reconciler
//!
//! Keeps one authoritative remote todo collection consistent with local
//! edits and propagates remote changes back into local state.
//!
//! Local edits are proposed optimistically (the local snapshot updates
//! at once) and pushed after a debounce window so rapid edits coalesce
//! into a single remote write; a newer proposal supersedes a pending
//! one. The remote store echoes every write back to the writer, and the
//! listener replaces the local snapshot wholesale on every
//! notification, so reconciliation stays idempotent with no
//! suppress-next bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use shared::{parse_todo_snapshot, TodoItem};

use crate::storage::{todos_path, CollectionStore};

/// Default quiet period before a proposed collection is pushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Default)]
struct Inner {
    path: Option<String>,
    listener: Option<JoinHandle<()>>,
    pending_push: Option<JoinHandle<()>>,
}

pub struct SyncReconciler {
    store: Arc<dyn CollectionStore>,
    debounce: Duration,
    snapshot_tx: watch::Sender<Vec<TodoItem>>,
    /// Bumped on every proposal; a pending push only fires if it still
    /// holds the latest generation after the debounce sleep.
    generation: Arc<AtomicU64>,
    inner: Mutex<Inner>,
}

impl SyncReconciler {
    pub fn new(store: Arc<dyn CollectionStore>, debounce: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            store,
            debounce,
            snapshot_tx,
            generation: Arc::new(AtomicU64::new(0)),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The latest local snapshot of the user's todos.
    pub fn current(&self) -> Vec<TodoItem> {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch the local snapshot; the UI re-derives its projections on
    /// every change delivered here.
    pub fn watch(&self) -> watch::Receiver<Vec<TodoItem>> {
        self.snapshot_tx.subscribe()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().unwrap().path.is_some()
    }

    /// Attach the remote listener for `account_id`. Any prior listener
    /// is detached first, so there is exactly one live listener.
    pub async fn attach(&self, account_id: &str) -> Result<()> {
        self.detach().await;

        let path = todos_path(account_id);
        info!("Attaching todos listener for {}", path);

        let mut rx = self.store.subscribe(&path).await?;

        // Seed from the current remote value; a read failure surfaces
        // as an empty collection, not a crash.
        let initial = match self.store.read_once(&path).await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read initial snapshot for {}: {}", path, e);
                serde_json::Value::Null
            }
        };
        self.snapshot_tx.send_replace(parse_todo_snapshot(&initial));

        let snapshot_tx = self.snapshot_tx.clone();
        let listener_path = path.clone();
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(snapshot) => {
                        let todos = parse_todo_snapshot(&snapshot);
                        debug!("Snapshot for {} carried {} todos", listener_path, todos.len());
                        snapshot_tx.send_replace(todos);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        // Only the latest snapshot matters; skipped
                        // intermediates are harmless.
                        warn!("Listener for {} lagged, skipped {} snapshots", listener_path, missed);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Listener channel for {} closed", listener_path);
                        break;
                    }
                }
            }
        });

        let mut inner = self.inner.lock().unwrap();
        inner.path = Some(path);
        inner.listener = Some(listener);
        Ok(())
    }

    /// Detach the listener and abandon any pending push. Because store
    /// writes replace atomically, an abandoned push never applies
    /// partially.
    pub async fn detach(&self) {
        let (path, listener, pending) = {
            let mut inner = self.inner.lock().unwrap();
            (inner.path.take(), inner.listener.take(), inner.pending_push.take())
        };

        if let Some(pending) = pending {
            pending.abort();
        }
        if let Some(listener) = listener {
            listener.abort();
        }

        if let Some(path) = path {
            info!("Detaching todos listener for {}", path);
            if let Err(e) = self.store.unsubscribe(&path).await {
                error!("Failed to unsubscribe {}: {}", path, e);
            }
        }

        self.snapshot_tx.send_replace(Vec::new());
    }

    /// Propose a new collection: replace the local snapshot at once and
    /// schedule a debounced push. Last write wins; a proposal arriving
    /// inside the window supersedes the pending one.
    pub fn propose(&self, todos: Vec<TodoItem>) {
        let path = match self.inner.lock().unwrap().path.clone() {
            Some(path) => path,
            None => {
                warn!("Cannot save todos: no authenticated user");
                return;
            }
        };

        self.snapshot_tx.send_replace(todos.clone());

        let generation = Arc::clone(&self.generation);
        let gen = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let store = Arc::clone(&self.store);
        let debounce = self.debounce;

        let push = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generation.load(Ordering::SeqCst) != gen {
                // Superseded while we slept.
                return;
            }

            let value = match serde_json::to_value(&todos) {
                Ok(value) => value,
                Err(e) => {
                    error!("Failed to serialize todos for {}: {}", path, e);
                    return;
                }
            };

            match store.write(&path, value).await {
                Ok(()) => debug!("Pushed {} todos to {}", todos.len(), path),
                // Not retried; the next edit pushes again and the
                // remote store stays the source of truth.
                Err(e) => error!("Failed to push todos to {}: {}", path, e),
            }
        });

        let mut inner = self.inner.lock().unwrap();
        if let Some(previous) = inner.pending_push.replace(push) {
            previous.abort();
        }
    }
}
