//! Integration tests for `SqliteStore` against an in-memory database.

use keyward_core::{
  custody::Transition,
  key::{KeyPatch, KeyType, NewKey},
  ledger::{Exchange, NewRecord, RecordPatch},
  principal::Principal,
  store::CustodyStore,
  user::{NewUser, Role, UserPatch},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn door_key(tag: &str, sequence: i64) -> NewKey {
  NewKey {
    tag_number:  tag.into(),
    series_id:   "A-1".into(),
    sequence_id: sequence,
    building:    "McBryde".into(),
    key_type:    KeyType::Door,
    location:    vec!["226".into()],
    comment:     String::new(),
  }
}

fn requestor(pid: &str) -> NewUser {
  NewUser {
    pid:       pid.into(),
    full_name: "Jane Doe".into(),
    role:      Role::Requestor,
  }
}

fn admin(pid: &str) -> Principal {
  Principal::new(pid, Role::Administrator)
}

/// A store with key "101" and user "jdoe" already present.
async fn seeded() -> SqliteStore {
  let s = store().await;
  s.add_key(door_key("101", 1)).await.unwrap();
  s.add_user(requestor("jdoe")).await.unwrap();
  s
}

async fn assign(s: &SqliteStore, tag: &str, pid: &str) {
  s.transition(tag, Transition::Assign { pid: pid.into() })
    .await
    .unwrap();
}

// ─── Key registry ────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_key() {
  let s = store().await;

  let key = s.add_key(door_key("101", 1)).await.unwrap();
  assert!(key.is_available);

  let fetched = s.get_key("101").await.unwrap().expect("key present");
  assert_eq!(fetched.tag_number, "101");
  assert_eq!(fetched.key_type, KeyType::Door);
  assert_eq!(fetched.location, vec!["226".to_string()]);
  assert!(fetched.is_available);
}

#[tokio::test]
async fn get_key_missing_returns_none() {
  let s = store().await;
  assert!(s.get_key("999").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_tag_is_a_conflict() {
  let s = store().await;
  s.add_key(door_key("101", 1)).await.unwrap();

  let err = s.add_key(door_key("101", 2)).await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::DuplicateTag("101".into())
  );
}

#[tokio::test]
async fn duplicate_series_pair_is_a_conflict() {
  let s = store().await;
  s.add_key(door_key("101", 1)).await.unwrap();

  // Different tag, same (series, sequence) pair.
  let err = s.add_key(door_key("102", 1)).await.unwrap_err();
  assert!(matches!(
    err.domain_err(),
    keyward_core::Error::DuplicateSeries { .. }
  ));
}

#[tokio::test]
async fn invalid_tag_is_rejected_before_any_write() {
  let s = store().await;
  let mut bad = door_key("101", 1);
  bad.tag_number = "10a".into();

  let err = s.add_key(bad).await.unwrap_err();
  assert!(matches!(
    err.domain_err(),
    keyward_core::Error::Validation(_)
  ));
  assert!(s.list_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_key_patches_attributes() {
  let s = store().await;
  s.add_key(door_key("101", 1)).await.unwrap();

  let patch = KeyPatch {
    building: Some("Torgersen".into()),
    comment:  Some("master copy".into()),
    ..Default::default()
  };
  let updated = s.update_key("101", patch).await.unwrap();
  assert_eq!(updated.building, "Torgersen");
  assert_eq!(updated.comment, "master copy");
  assert_eq!(updated.series_id, "A-1");
}

#[tokio::test]
async fn update_missing_key_is_not_found() {
  let s = store().await;
  let err = s.update_key("999", KeyPatch::default()).await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::KeyNotFound("999".into())
  );
}

#[tokio::test]
async fn rename_collision_is_a_conflict() {
  let s = store().await;
  s.add_key(door_key("101", 1)).await.unwrap();
  s.add_key(door_key("102", 2)).await.unwrap();

  let patch = KeyPatch { tag_number: Some("102".into()), ..Default::default() };
  let err = s.update_key("101", patch).await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::DuplicateTag("102".into())
  );
}

#[tokio::test]
async fn rename_moves_custody_but_not_ledger_history() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  let patch = KeyPatch { tag_number: Some("201".into()), ..Default::default() };
  s.update_key("101", patch).await.unwrap();

  // Custody followed the rename.
  let owner = s.key_owner("201").await.unwrap().expect("owner");
  assert_eq!(owner.pid, "jdoe");
  let jdoe = s.get_user("jdoe").await.unwrap().unwrap();
  assert_eq!(jdoe.owned_keys, vec!["201".to_string()]);

  // The ledger still narrates the acquisition at the old tag.
  let records = s.list_records().await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].tag_number, "101");
}

#[tokio::test]
async fn delete_available_key_succeeds() {
  let s = store().await;
  s.add_key(door_key("101", 1)).await.unwrap();

  s.delete_key("101").await.unwrap();
  assert!(s.get_key("101").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_owned_key_is_a_conflict_until_returned() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  let err = s.delete_key("101").await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::DeleteOwnedKey("101".into())
  );

  s.transition(
    "101",
    Transition::Return { acting: Principal::new("jdoe", Role::Requestor) },
  )
  .await
  .unwrap();

  s.delete_key("101").await.unwrap();
  assert!(s.get_key("101").await.unwrap().is_none());
}

#[tokio::test]
async fn key_owner_resolves_the_holder() {
  let s = seeded().await;
  assert!(s.key_owner("101").await.unwrap().is_none());

  assign(&s, "101", "jdoe").await;
  let owner = s.key_owner("101").await.unwrap().expect("owner");
  assert_eq!(owner.pid, "jdoe");
}

#[tokio::test]
async fn reconcile_is_a_noop_for_unowned_and_conflict_for_owned() {
  let s = seeded().await;
  s.reconcile_key("101").await.unwrap();

  assign(&s, "101", "jdoe").await;
  let err = s.reconcile_key("101").await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::StillOwned { tag: "101".into(), owner: "jdoe".into() }
  );
}

// ─── User directory ──────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;
  s.add_user(requestor("jdoe")).await.unwrap();

  let user = s.get_user("jdoe").await.unwrap().expect("user present");
  assert_eq!(user.full_name, "Jane Doe");
  assert_eq!(user.role, Role::Requestor);
  assert!(user.owned_keys.is_empty());
}

#[tokio::test]
async fn duplicate_pid_is_a_conflict() {
  let s = store().await;
  s.add_user(requestor("jdoe")).await.unwrap();

  let err = s.add_user(requestor("jdoe")).await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::DuplicatePid("jdoe".into())
  );
}

#[tokio::test]
async fn lookup_by_name_is_best_effort() {
  let s = store().await;
  s.add_user(requestor("jdoe")).await.unwrap();
  s.add_user(requestor("jdoe2")).await.unwrap(); // same full name

  // Some match comes back; which one is unspecified.
  let user = s.get_user_by_name("Jane Doe").await.unwrap().expect("a match");
  assert_eq!(user.full_name, "Jane Doe");

  assert!(s.get_user_by_name("Nobody Here").await.unwrap().is_none());
}

#[tokio::test]
async fn update_user_changes_name_and_role() {
  let s = store().await;
  s.add_user(requestor("jdoe")).await.unwrap();

  let patch = UserPatch {
    full_name: Some("Janet Doe".into()),
    role:      Some(Role::Administrator),
  };
  let updated = s.update_user("jdoe", patch, &admin("boss")).await.unwrap();
  assert_eq!(updated.full_name, "Janet Doe");
  assert_eq!(updated.role, Role::Administrator);
}

#[tokio::test]
async fn self_role_change_is_forbidden() {
  let s = store().await;
  s.add_user(NewUser {
    pid:       "boss".into(),
    full_name: "The Boss".into(),
    role:      Role::Administrator,
  })
  .await
  .unwrap();

  // Even a downgrade of one's own role is refused.
  let patch = UserPatch { full_name: None, role: Some(Role::Requestor) };
  let err = s.update_user("boss", patch, &admin("boss")).await.unwrap_err();
  assert_eq!(err.domain_err(), &keyward_core::Error::SelfRoleChange);

  // Changing only one's own name is fine.
  let patch = UserPatch { full_name: Some("Still The Boss".into()), role: None };
  assert!(s.update_user("boss", patch, &admin("boss")).await.is_ok());
}

#[tokio::test]
async fn delete_user_refused_while_holding_keys() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  let err = s.delete_user("jdoe").await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::DeleteKeyHolder { pid: "jdoe".into(), count: 1 }
  );

  s.transition(
    "101",
    Transition::ForceReturn { pid: "jdoe".into(), acknowledged: true },
  )
  .await
  .unwrap();
  s.delete_user("jdoe").await.unwrap();
  assert!(s.get_user("jdoe").await.unwrap().is_none());
}

#[tokio::test]
async fn owned_keys_lists_full_key_records() {
  let s = seeded().await;
  s.add_key(door_key("102", 2)).await.unwrap();
  assign(&s, "101", "jdoe").await;
  assign(&s, "102", "jdoe").await;

  let keys = s.owned_keys("jdoe").await.unwrap();
  assert_eq!(keys.len(), 2);
  assert!(keys.iter().all(|k| !k.is_available));

  let err = s.owned_keys("ghost").await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::UserNotFound("ghost".into())
  );
}

// ─── Custody transitions ─────────────────────────────────────────────────────

#[tokio::test]
async fn assign_marks_unavailable_and_appends_acquired() {
  let s = seeded().await;

  let record = s
    .transition("101", Transition::Assign { pid: "jdoe".into() })
    .await
    .unwrap();
  assert_eq!(record.tag_number, "101");
  assert_eq!(record.pid, "jdoe");
  assert_eq!(record.exchange, Exchange::Acquired);

  let key = s.get_key("101").await.unwrap().unwrap();
  assert!(!key.is_available);
  let user = s.get_user("jdoe").await.unwrap().unwrap();
  assert_eq!(user.owned_keys, vec!["101".to_string()]);
}

#[tokio::test]
async fn assign_unknown_user_is_not_found_and_writes_nothing() {
  let s = seeded().await;

  let err = s
    .transition("101", Transition::Assign { pid: "ghost".into() })
    .await
    .unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::UserNotFound("ghost".into())
  );

  assert!(s.get_key("101").await.unwrap().unwrap().is_available);
  assert!(s.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn assign_owned_key_is_a_conflict_and_writes_nothing() {
  let s = seeded().await;
  s.add_user(requestor("asmith")).await.unwrap();
  assign(&s, "101", "jdoe").await;

  let err = s
    .transition("101", Transition::Assign { pid: "asmith".into() })
    .await
    .unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::AlreadyOwned { tag: "101".into(), owner: "jdoe".into() }
  );

  // Exactly the one acquisition record from the successful assign.
  assert_eq!(s.list_records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn assign_then_return_round_trip() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  s.transition(
    "101",
    Transition::Return { acting: Principal::new("jdoe", Role::Requestor) },
  )
  .await
  .unwrap();

  assert!(s.get_key("101").await.unwrap().unwrap().is_available);
  assert!(s.get_user("jdoe").await.unwrap().unwrap().owned_keys.is_empty());

  // Exactly two records, newest first: returned, then acquired.
  let records = s.list_records().await.unwrap();
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].exchange, Exchange::Returned);
  assert_eq!(records[1].exchange, Exchange::Acquired);
  assert!(records.iter().all(|r| r.tag_number == "101" && r.pid == "jdoe"));
}

#[tokio::test]
async fn second_return_fails_and_appends_nothing() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  let return_t = || Transition::Return {
    acting: Principal::new("jdoe", Role::Requestor),
  };
  s.transition("101", return_t()).await.unwrap();

  let err = s.transition("101", return_t()).await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::KeyUnowned("101".into())
  );
  assert_eq!(s.list_records().await.unwrap().len(), 2);
}

#[tokio::test]
async fn force_return_requires_acknowledgement() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  let err = s
    .transition(
      "101",
      Transition::ForceReturn { pid: "jdoe".into(), acknowledged: false },
    )
    .await
    .unwrap_err();
  assert_eq!(err.domain_err(), &keyward_core::Error::Unacknowledged);
  assert!(!s.get_key("101").await.unwrap().unwrap().is_available);

  s.transition(
    "101",
    Transition::ForceReturn { pid: "jdoe".into(), acknowledged: true },
  )
  .await
  .unwrap();
  assert!(s.get_key("101").await.unwrap().unwrap().is_available);
  assert!(s.get_user("jdoe").await.unwrap().unwrap().owned_keys.is_empty());

  let records = s.list_records().await.unwrap();
  assert_eq!(records[0].exchange, Exchange::Returned);
}

#[tokio::test]
async fn report_clears_custody_and_keeps_the_reason() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;

  let record = s
    .transition(
      "101",
      Transition::Report { pid: "jdoe".into(), reason: "left on the bus".into() },
    )
    .await
    .unwrap();
  assert_eq!(record.exchange, Exchange::Reported);
  assert_eq!(record.comment, "left on the bus");

  assert!(s.get_key("101").await.unwrap().unwrap().is_available);
}

#[tokio::test]
async fn concurrent_assigns_yield_exactly_one_success() {
  let s = seeded().await;
  s.add_user(requestor("asmith")).await.unwrap();

  let a = s.transition("101", Transition::Assign { pid: "jdoe".into() });
  let b = s.transition("101", Transition::Assign { pid: "asmith".into() });
  let (ra, rb) = tokio::join!(a, b);

  assert!(
    ra.is_ok() != rb.is_ok(),
    "exactly one assign must win: {ra:?} / {rb:?}"
  );
  let loser = if ra.is_ok() { rb } else { ra };
  assert!(matches!(
    loser.unwrap_err().domain_err(),
    keyward_core::Error::AlreadyOwned { .. }
  ));

  // One owner, one ledger record.
  assert!(s.key_owner("101").await.unwrap().is_some());
  assert_eq!(s.list_records().await.unwrap().len(), 1);
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_append_and_get() {
  let s = store().await;

  let record = s
    .append_record(NewRecord {
      tag_number: "101".into(),
      pid:        "jdoe".into(),
      date:       None,
      exchange:   Exchange::Acquired,
      comment:    "paper ledger backfill".into(),
    })
    .await
    .unwrap();

  let fetched = s.get_record(record.record_id).await.unwrap().expect("record");
  assert_eq!(fetched.tag_number, "101");
  assert_eq!(fetched.comment, "paper ledger backfill");
}

#[tokio::test]
async fn get_record_missing_returns_none() {
  let s = store().await;
  assert!(s.get_record(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn correction_edits_do_not_touch_custody() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;
  let record_id = s.list_records().await.unwrap()[0].record_id;

  // An administrator "corrects" the record to say returned. The escape
  // hatch edits only the narrative; jdoe still holds the key.
  s.update_record(
    record_id,
    RecordPatch { exchange: Some(Exchange::Returned), ..Default::default() },
  )
  .await
  .unwrap();

  assert!(!s.get_key("101").await.unwrap().unwrap().is_available);
  let fetched = s.get_record(record_id).await.unwrap().unwrap();
  assert_eq!(fetched.exchange, Exchange::Returned);
}

#[tokio::test]
async fn delete_record_is_the_correction_path() {
  let s = seeded().await;
  assign(&s, "101", "jdoe").await;
  let record_id = s.list_records().await.unwrap()[0].record_id;

  s.delete_record(record_id).await.unwrap();
  assert!(s.list_records().await.unwrap().is_empty());

  let err = s.delete_record(record_id).await.unwrap_err();
  assert_eq!(
    err.domain_err(),
    &keyward_core::Error::RecordNotFound(record_id)
  );
}

#[tokio::test]
async fn records_list_newest_first() {
  let s = seeded().await;
  s.add_key(door_key("102", 2)).await.unwrap();
  assign(&s, "101", "jdoe").await;
  assign(&s, "102", "jdoe").await;

  let records = s.list_records().await.unwrap();
  assert_eq!(records.len(), 2);
  assert!(records[0].date >= records[1].date);
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_email_round_trip() {
  let s = store().await;
  assert!(s.admin_email().await.unwrap().is_none());

  s.set_admin_email("facilities@cs.example.edu").await.unwrap();
  assert_eq!(
    s.admin_email().await.unwrap().as_deref(),
    Some("facilities@cs.example.edu")
  );

  // Overwrite, not append.
  s.set_admin_email("keys@cs.example.edu").await.unwrap();
  assert_eq!(
    s.admin_email().await.unwrap().as_deref(),
    Some("keys@cs.example.edu")
  );
}

#[tokio::test]
async fn admin_email_must_be_valid() {
  let s = store().await;
  let err = s.set_admin_email("not-an-email").await.unwrap_err();
  assert!(matches!(
    err.domain_err(),
    keyward_core::Error::Validation(_)
  ));
}

// ─── Test helper ─────────────────────────────────────────────────────────────

impl crate::Error {
  /// Unwrap the domain error inside a store error; panics on backend errors.
  fn domain_err(&self) -> &keyward_core::Error {
    match self {
      crate::Error::Domain(e) => e,
      other => panic!("expected a domain error, got: {other}"),
    }
  }
}
