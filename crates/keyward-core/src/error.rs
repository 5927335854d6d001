//! Error types for `keyward-core`.

use thiserror::Error;
use uuid::Uuid;

/// The class of a domain error. The API layer maps each kind to exactly one
/// HTTP status code, so a failure never needs per-handler status logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  Forbidden,
  Validation,
  Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("key with tag {0} does not exist")]
  KeyNotFound(String),

  #[error("user with pid {0} does not exist")]
  UserNotFound(String),

  #[error("no user with full name {0}")]
  NameNotFound(String),

  #[error("ledger record {0} does not exist")]
  RecordNotFound(Uuid),

  #[error("key {0} has no owner")]
  KeyUnowned(String),

  #[error("a key with tag {0} already exists")]
  DuplicateTag(String),

  #[error("a key with series {series_id} and sequence {sequence_id} already exists")]
  DuplicateSeries { series_id: String, sequence_id: i64 },

  #[error("a user with pid {0} already exists")]
  DuplicatePid(String),

  #[error("key {tag} is already held by {owner}")]
  AlreadyOwned { tag: String, owner: String },

  #[error("key {tag} is not held by {pid}")]
  NotOwnedBy { tag: String, pid: String },

  #[error("cannot mark key {tag} available: {owner} still holds it")]
  StillOwned { tag: String, owner: String },

  #[error("cannot delete key {0} while it is held; force-return it first")]
  DeleteOwnedKey(String),

  #[error("cannot delete user {pid}: they still hold {count} key(s)")]
  DeleteKeyHolder { pid: String, count: usize },

  #[error("administrator role or higher required")]
  AdminRequired,

  #[error("users cannot change their own role")]
  SelfRoleChange,

  #[error("force-return requires explicit acknowledgement")]
  Unacknowledged,

  #[error("{0}")]
  Validation(String),

  #[error("custody transition failed to commit: {0}")]
  Internal(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::KeyNotFound(_)
      | Error::UserNotFound(_)
      | Error::NameNotFound(_)
      | Error::RecordNotFound(_)
      | Error::KeyUnowned(_) => ErrorKind::NotFound,

      Error::DuplicateTag(_)
      | Error::DuplicateSeries { .. }
      | Error::DuplicatePid(_)
      | Error::AlreadyOwned { .. }
      | Error::NotOwnedBy { .. }
      | Error::StillOwned { .. }
      | Error::DeleteOwnedKey(_)
      | Error::DeleteKeyHolder { .. } => ErrorKind::Conflict,

      Error::AdminRequired | Error::SelfRoleChange | Error::Unacknowledged => {
        ErrorKind::Forbidden
      }

      Error::Validation(_) => ErrorKind::Validation,

      Error::Internal(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_classify_the_taxonomy() {
    assert_eq!(Error::KeyNotFound("101".into()).kind(), ErrorKind::NotFound);
    assert_eq!(Error::DuplicatePid("jdoe".into()).kind(), ErrorKind::Conflict);
    assert_eq!(Error::SelfRoleChange.kind(), ErrorKind::Forbidden);
    assert_eq!(Error::Unacknowledged.kind(), ErrorKind::Forbidden);
    assert_eq!(
      Error::Validation("bad tag".into()).kind(),
      ErrorKind::Validation
    );
    assert_eq!(Error::Internal("rollback".into()).kind(), ErrorKind::Internal);
  }
}
