//! Error type for `keyward-store-sqlite`.

use keyward_core::store::AsDomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain-level refusal (not found, conflict, forbidden, validation).
  #[error(transparent)]
  Domain(#[from] keyward_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column held a value no current variant matches.
  #[error("corrupt column value: {0}")]
  Corrupt(String),
}

impl AsDomainError for Error {
  fn domain(&self) -> Option<&keyward_core::Error> {
    match self {
      Error::Domain(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
