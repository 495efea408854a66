//! Storage backends and the traits that keep them interchangeable.

pub mod local;
pub mod memory;
pub mod traits;

pub use traits::{todos_path, AccountService, AuthError, CollectionStore, PreferenceStore};
