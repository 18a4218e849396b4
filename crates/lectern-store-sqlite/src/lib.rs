//! SQLite backend for the Lectern class store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every successful write publishes a
//! [`lectern_core::store::ChangeNotice`] on a broadcast channel, which is how
//! the sync layer's listeners learn that their queries may be stale.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
