//! Key — a physical key tracked by the registry.
//!
//! A key is identified by its `tag_number`, the stamped identifier on the
//! physical tag. Availability is not stored independently: a key is available
//! iff no user currently holds it, so the flag is derived from custody at
//! read time and can never drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Result, validate};

/// What the key opens.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyType {
  Door,
  DisplayCase,
  FileCabinet,
}

/// A key record as returned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
  pub tag_number:   String,
  pub series_id:    String,
  pub sequence_id:  i64,
  pub building:     String,
  pub key_type:     KeyType,
  /// One or more location tags — a key may be cut for several doors.
  pub location:     Vec<String>,
  pub comment:      String,
  /// `true` iff no user currently holds this key.
  pub is_available: bool,
  pub created_at:   DateTime<Utc>,
}

/// Attributes for a key being added to the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewKey {
  pub tag_number:  String,
  pub series_id:   String,
  pub sequence_id: i64,
  pub building:    String,
  pub key_type:    KeyType,
  pub location:    Vec<String>,
  #[serde(default)]
  pub comment:     String,
}

impl NewKey {
  pub fn validate(&self) -> Result<()> {
    validate::tag_number(&self.tag_number)?;
    validate::series_id(&self.series_id)?;
    validate::sequence_id(self.sequence_id)?;
    validate::building(&self.building)?;
    validate::locations(&self.location)?;
    validate::comment(&self.comment)?;
    Ok(())
  }
}

/// Partial update for a key; absent fields are left untouched.
///
/// Setting `tag_number` renames the key. Ledger records are never rewritten
/// on rename: they narrate events at the tag identity that existed at the
/// time, not a live foreign key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyPatch {
  pub tag_number:  Option<String>,
  pub series_id:   Option<String>,
  pub sequence_id: Option<i64>,
  pub building:    Option<String>,
  pub key_type:    Option<KeyType>,
  pub location:    Option<Vec<String>>,
  pub comment:     Option<String>,
}

impl KeyPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(tag) = &self.tag_number {
      validate::tag_number(tag)?;
    }
    if let Some(series) = &self.series_id {
      validate::series_id(series)?;
    }
    if let Some(seq) = self.sequence_id {
      validate::sequence_id(seq)?;
    }
    if let Some(building) = &self.building {
      validate::building(building)?;
    }
    if let Some(location) = &self.location {
      validate::locations(location)?;
    }
    if let Some(comment) = &self.comment {
      validate::comment(comment)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_key() -> NewKey {
    NewKey {
      tag_number:  "101".into(),
      series_id:   "A-1".into(),
      sequence_id: 7,
      building:    "McBryde".into(),
      key_type:    KeyType::Door,
      location:    vec!["226".into()],
      comment:     String::new(),
    }
  }

  #[test]
  fn new_key_validates() {
    assert!(new_key().validate().is_ok());

    let mut bad = new_key();
    bad.tag_number = "10a".into();
    assert!(bad.validate().is_err());

    let mut bad = new_key();
    bad.location = vec![];
    assert!(bad.validate().is_err());
  }

  #[test]
  fn key_type_string_forms() {
    assert_eq!(KeyType::DisplayCase.to_string(), "display_case");
    assert_eq!("file_cabinet".parse::<KeyType>().unwrap(), KeyType::FileCabinet);
    assert!("cabinet".parse::<KeyType>().is_err());
  }

  #[test]
  fn empty_patch_validates() {
    assert!(KeyPatch::default().validate().is_ok());
  }
}
