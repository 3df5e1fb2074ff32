//! Database storage layer
//!
//! SQLite-backed, append-only store of analysis records. The store is a
//! soft dependency of the pipeline: a failed write is logged and the
//! analysis still succeeds.

pub mod repo;
pub mod schema;

pub use repo::Database;
