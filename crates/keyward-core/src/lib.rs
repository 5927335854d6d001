//! Core types and trait definitions for the Keyward custody ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod custody;
pub mod error;
pub mod key;
pub mod ledger;
pub mod principal;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
