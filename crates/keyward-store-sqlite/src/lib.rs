//! SQLite backend for the Keyward custody store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The single connection also serializes
//! custody transitions, which is what makes two racing assigns on the same
//! tag resolve to exactly one success.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
