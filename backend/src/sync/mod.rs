//! Reconciliation between local UI state and the remote collection.

pub mod reconciler;

pub use reconciler::{SyncReconciler, DEFAULT_DEBOUNCE};
