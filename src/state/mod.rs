//! State Management
//!
//! Application-wide state handed to every view.

pub mod app;

pub use app::{AppState, CatalogStatus, StateEvent};
