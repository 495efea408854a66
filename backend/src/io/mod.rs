//! HTTP interface.

pub mod rest;

pub use rest::{api_routes, AppState};
