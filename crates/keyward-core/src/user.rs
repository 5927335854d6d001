//! User — a person who can request and hold keys.
//!
//! Users are identified by pid. A pid is usually the institutional login
//! name, but administrators may assign a mock identifier (often an email
//! address) for people without one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Result, validate};

/// Access level. `sudo` exists so at least one account can always repair
/// administrator assignments.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  Requestor,
  Administrator,
  Sudo,
}

impl Role {
  pub fn is_admin(self) -> bool {
    matches!(self, Role::Administrator | Role::Sudo)
  }
}

/// A user record as returned by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub pid:        String,
  pub full_name:  String,
  pub role:       Role,
  /// Tags of keys currently in this user's custody.
  pub owned_keys: Vec<String>,
  pub created_at: DateTime<Utc>,
}

/// Attributes for a user being added to the directory. Role defaults to
/// requestor; users created on first sign-in get the placeholder name "NA"
/// until they edit their profile.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub pid:       String,
  pub full_name: String,
  #[serde(default)]
  pub role:      Role,
}

impl NewUser {
  /// A minimal record for a principal seen for the first time.
  pub fn first_sighting(pid: impl Into<String>) -> Self {
    NewUser {
      pid:       pid.into(),
      full_name: "NA".to_string(),
      role:      Role::Requestor,
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate::pid(&self.pid)?;
    validate::full_name(&self.full_name)?;
    Ok(())
  }
}

/// Partial update for a user. Role changes are administrator-only and are
/// additionally refused when a principal targets their own pid, so an
/// administrator can never lock themselves out.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
  pub full_name: Option<String>,
  pub role:      Option<Role>,
}

impl UserPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.full_name {
      validate::full_name(name)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn admin_roles() {
    assert!(!Role::Requestor.is_admin());
    assert!(Role::Administrator.is_admin());
    assert!(Role::Sudo.is_admin());
  }

  #[test]
  fn role_string_forms() {
    assert_eq!(Role::Administrator.to_string(), "administrator");
    assert_eq!("sudo".parse::<Role>().unwrap(), Role::Sudo);
    assert!("superuser".parse::<Role>().is_err());
  }

  #[test]
  fn first_sighting_is_a_requestor() {
    let user = NewUser::first_sighting("jdoe");
    assert_eq!(user.role, Role::Requestor);
    assert_eq!(user.full_name, "NA");
    assert!(user.validate().is_ok());
  }
}
