//! The `CustodyStore` trait — the seam between the domain and storage.
//!
//! The trait is implemented by storage backends (e.g.
//! `keyward-store-sqlite`). The API layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  custody::Transition,
  key::{Key, KeyPatch, NewKey},
  ledger::{LedgerRecord, NewRecord, RecordPatch},
  principal::Principal,
  user::{NewUser, User, UserPatch},
};

/// Implemented by backend error types so the API layer can recover the
/// domain error — and therefore the HTTP status class — from a failure.
/// Backend-internal failures (I/O, corrupt rows) return `None` and are
/// treated as Internal.
pub trait AsDomainError {
  fn domain(&self) -> Option<&crate::Error>;
}

/// Abstraction over a Keyward storage backend.
///
/// The custody invariant — a key is available iff no user holds it, and at
/// most one user holds it at a time — is owned by the implementation. Every
/// custody-changing operation goes through [`transition`], which must commit
/// the registry change, the directory change and the ledger append as one
/// atomic unit, and must serialize concurrent transitions on the same tag so
/// that exactly one of two racing assigns succeeds.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
///
/// [`transition`]: CustodyStore::transition
pub trait CustodyStore: Send + Sync {
  type Error: std::error::Error + AsDomainError + Send + Sync + 'static;

  // ── Key registry ──────────────────────────────────────────────────────

  fn list_keys(
    &self,
  ) -> impl Future<Output = Result<Vec<Key>, Self::Error>> + Send + '_;

  /// Retrieve a key by tag. Returns `None` if not found.
  fn get_key<'a>(
    &'a self,
    tag: &'a str,
  ) -> impl Future<Output = Result<Option<Key>, Self::Error>> + Send + 'a;

  /// Add a key to the registry. Fails with a Conflict when the tag or the
  /// (series, sequence) pair is already taken. New keys are available.
  fn add_key(
    &self,
    input: NewKey,
  ) -> impl Future<Output = Result<Key, Self::Error>> + Send + '_;

  /// Patch a key's descriptive attributes. A changed `tag_number` is a
  /// rename: current custody follows the key, historical ledger records do
  /// not. Custody state is never changed by this operation.
  fn update_key<'a>(
    &'a self,
    tag: &'a str,
    patch: KeyPatch,
  ) -> impl Future<Output = Result<Key, Self::Error>> + Send + 'a;

  /// Remove a key from the registry. Refused with a Conflict while the key
  /// is in someone's custody; force-return it first.
  fn delete_key<'a>(
    &'a self,
    tag: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The user currently holding the key, or `None` when it is available.
  fn key_owner<'a>(
    &'a self,
    tag: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Legacy repair path for `PATCH /keys/{tag}/return`: succeed (as a
  /// no-op — availability is derived) when the key is unowned, fail with a
  /// Conflict naming the holder when it is not.
  fn reconcile_key<'a>(
    &'a self,
    tag: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── User directory ────────────────────────────────────────────────────

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Retrieve a user by pid. Returns `None` if not found.
  fn get_user<'a>(
    &'a self,
    pid: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Best-effort lookup by full name. Names are not unique; when several
  /// users share one, an arbitrary match is returned. Prefer
  /// [`get_user`](CustodyStore::get_user) wherever a pid is known.
  fn get_user_by_name<'a>(
    &'a self,
    full_name: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Add a user. Fails with a Conflict when the pid is taken.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Patch a user's name and, administrator-only, role. Fails Forbidden
  /// when `acting` targets their own role (self-lockout prevention) — role
  /// gating itself happens in the API layer.
  fn update_user<'a>(
    &'a self,
    pid: &'a str,
    patch: UserPatch,
    acting: &'a Principal,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  /// Remove a user. Refused with a Conflict while they hold keys, which
  /// would otherwise orphan the custody relation.
  fn delete_user<'a>(
    &'a self,
    pid: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The keys currently in the user's custody.
  fn owned_keys<'a>(
    &'a self,
    pid: &'a str,
  ) -> impl Future<Output = Result<Vec<Key>, Self::Error>> + Send + 'a;

  // ── Custody transitions ───────────────────────────────────────────────

  /// Execute a custody transition on `tag` atomically: registry, directory
  /// and ledger change together or not at all. Returns the appended ledger
  /// record.
  fn transition<'a>(
    &'a self,
    tag: &'a str,
    transition: Transition,
  ) -> impl Future<Output = Result<LedgerRecord, Self::Error>> + Send + 'a;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// All ledger records, descending by date.
  fn list_records(
    &self,
  ) -> impl Future<Output = Result<Vec<LedgerRecord>, Self::Error>> + Send + '_;

  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<LedgerRecord>, Self::Error>> + Send + '_;

  /// Append a record outside the transition protocol — the administrator
  /// correction path. Does not touch key or user state.
  fn append_record(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<LedgerRecord, Self::Error>> + Send + '_;

  /// Correct an existing record. Escape hatch: the change is not validated
  /// against the custody invariant and is never replayed into the
  /// registries.
  fn update_record(
    &self,
    id: Uuid,
    patch: RecordPatch,
  ) -> impl Future<Output = Result<LedgerRecord, Self::Error>> + Send + '_;

  /// Delete a record. Same escape-hatch caveat as
  /// [`update_record`](CustodyStore::update_record).
  fn delete_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Settings ──────────────────────────────────────────────────────────

  /// The destination address for request/return/report notifications.
  fn admin_email(
    &self,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  fn set_admin_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
