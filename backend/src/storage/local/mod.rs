//! File-backed storage backend (the local-only variant).

pub mod accounts;
pub mod prefs;
pub mod store;

pub use accounts::LocalAccountService;
pub use prefs::JsonPreferenceStore;
pub use store::LocalFileStore;
