//! Database module for exported plans.
//!
//! Provides SQLite storage with an embedded schema.

mod models;
mod store;

pub use models::*;
pub use store::*;
