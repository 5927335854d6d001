//! Ledger — the append-oriented audit log of custody-changing events.
//!
//! A record narrates one exchange: who acquired, returned or reported a key,
//! and when. Records reference keys and users by external identifier, never
//! by ownership pointer; the ledger does not own registry state, it only
//! tells the story of its transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Result, validate};

/// The direction of an exchange.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Exchange {
  /// The user took custody of the key.
  Acquired,
  /// The key came back, by the user's own hand or an administrator's.
  Returned,
  /// The user reported the key lost or stolen.
  Reported,
}

/// One entry in the ledger. Immutable once written, except through the
/// administrator correction path ([`update_record`] / [`delete_record`]),
/// which does not replay key or user state.
///
/// [`update_record`]: crate::store::CustodyStore::update_record
/// [`delete_record`]: crate::store::CustodyStore::delete_record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
  pub record_id:  Uuid,
  pub tag_number: String,
  pub pid:        String,
  pub date:       DateTime<Utc>,
  pub exchange:   Exchange,
  pub comment:    String,
}

/// A record to append manually — the administrator correction path. The
/// transitions in [`custody`](crate::custody) build their entries internally.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
  pub tag_number: String,
  pub pid:        String,
  /// Defaults to the append time when absent.
  pub date:       Option<DateTime<Utc>>,
  pub exchange:   Exchange,
  #[serde(default)]
  pub comment:    String,
}

impl NewRecord {
  pub fn validate(&self) -> Result<()> {
    validate::tag_number(&self.tag_number)?;
    validate::pid(&self.pid)?;
    validate::comment(&self.comment)?;
    Ok(())
  }
}

/// Partial correction of an existing record; absent fields are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
  pub tag_number: Option<String>,
  pub pid:        Option<String>,
  pub date:       Option<DateTime<Utc>>,
  pub exchange:   Option<Exchange>,
  pub comment:    Option<String>,
}

impl RecordPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(tag) = &self.tag_number {
      validate::tag_number(tag)?;
    }
    if let Some(pid) = &self.pid {
      validate::pid(pid)?;
    }
    if let Some(comment) = &self.comment {
      validate::comment(comment)?;
    }
    Ok(())
  }
}
