//! The acting principal — request-scoped identity and role.
//!
//! The identity provider itself is outside this system; what the core
//! consumes is "who is calling, and with which role", resolved once per
//! request and passed explicitly into every operation that needs it. There
//! is deliberately no process-global notion of a current user.

use serde::Serialize;

use crate::{Error, Result, user::Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
  pub pid:  String,
  pub role: Role,
}

impl Principal {
  pub fn new(pid: impl Into<String>, role: Role) -> Self {
    Principal { pid: pid.into(), role }
  }

  /// Reject principals below administrator.
  pub fn require_admin(&self) -> Result<()> {
    if self.role.is_admin() {
      Ok(())
    } else {
      Err(Error::AdminRequired)
    }
  }
}
