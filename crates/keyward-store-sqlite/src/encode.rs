//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. The location list is stored
//! as compact JSON. UUIDs are stored as hyphenated lowercase strings. Enums
//! use their `strum` string forms, shared with the API layer.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use keyward_core::{
  key::{Key, KeyType},
  ledger::{Exchange, LedgerRecord},
  user::{Role, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_key_type(s: &str) -> Result<KeyType> {
  KeyType::from_str(s)
    .map_err(|_| Error::Corrupt(format!("unknown key type: {s:?}")))
}

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| Error::Corrupt(format!("unknown role: {s:?}")))
}

pub fn decode_exchange(s: &str) -> Result<Exchange> {
  Exchange::from_str(s)
    .map_err(|_| Error::Corrupt(format!("unknown exchange: {s:?}")))
}

// ─── Locations ───────────────────────────────────────────────────────────────

pub fn encode_locations(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_locations(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `keys` row left-joined with `custody`.
pub struct RawKey {
  pub tag_number:  String,
  pub series_id:   String,
  pub sequence_id: i64,
  pub building:    String,
  pub key_type:    String,
  pub location:    String,
  pub comment:     String,
  pub created_at:  String,
  /// pid from the custody join; `None` means the key is available.
  pub owner:       Option<String>,
}

impl RawKey {
  pub fn into_key(self) -> Result<Key> {
    Ok(Key {
      tag_number:   self.tag_number,
      series_id:    self.series_id,
      sequence_id:  self.sequence_id,
      building:     self.building,
      key_type:     decode_key_type(&self.key_type)?,
      location:     decode_locations(&self.location)?,
      comment:      self.comment,
      is_available: self.owner.is_none(),
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row; `owned_keys` is gathered by
/// a second query against `custody`.
pub struct RawUser {
  pub pid:        String,
  pub full_name:  String,
  pub role:       String,
  pub created_at: String,
  pub owned_keys: Vec<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      pid:        self.pid,
      full_name:  self.full_name,
      role:       decode_role(&self.role)?,
      owned_keys: self.owned_keys,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `ledger` row.
pub struct RawRecord {
  pub record_id:  String,
  pub tag_number: String,
  pub pid:        String,
  pub date:       String,
  pub exchange:   String,
  pub comment:    String,
}

impl RawRecord {
  pub fn into_record(self) -> Result<LedgerRecord> {
    Ok(LedgerRecord {
      record_id:  decode_uuid(&self.record_id)?,
      tag_number: self.tag_number,
      pid:        self.pid,
      date:       decode_dt(&self.date)?,
      exchange:   decode_exchange(&self.exchange)?,
      comment:    self.comment,
    })
  }
}
