//! Personal todo tracker backend.
//!
//! Layers, bottom to top: `storage` (collection stores, accounts,
//! preferences), `sync` (the debounced reconciler that keeps the local
//! snapshot and the remote collection in step), `domain` (todo and
//! session services plus the view projections), and `io` (the REST
//! surface).

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;
pub mod sync;
