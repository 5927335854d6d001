//! The key-custody state machine.
//!
//! A key is either available or held by exactly one user. Every
//! custody-changing operation routes through [`apply`], which checks the
//! transition's precondition against the key's current state and names the
//! ledger entry the store must append. The store is responsible for
//! persisting the returned [`Effect`] — custody change plus ledger append —
//! as one atomic unit; `apply` itself touches nothing.

use serde::Serialize;

use crate::{Error, Result, ledger::Exchange, principal::Principal};

// ─── States ──────────────────────────────────────────────────────────────────

/// The custody state of a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CustodyState {
  Available,
  Owned { pid: String },
}

impl CustodyState {
  /// Build a state from the pid column of a custody row, if any.
  pub fn from_owner(owner: Option<String>) -> Self {
    match owner {
      Some(pid) => CustodyState::Owned { pid },
      None => CustodyState::Available,
    }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// A requested custody transition for one key.
#[derive(Debug, Clone)]
pub enum Transition {
  /// Place the key in `pid`'s custody.
  Assign { pid: String },

  /// The holder hands the key back themselves. Only the current holder may
  /// self-return; anyone else must go through [`Transition::ForceReturn`].
  Return { acting: Principal },

  /// An administrator returns the key on the holder's behalf.
  /// `acknowledged` must be set by the caller: this overrides a user's
  /// custody without their action, and the confirmation cannot be implied.
  ForceReturn { pid: String, acknowledged: bool },

  /// The holder reports the key lost or stolen. The key leaves their
  /// custody, but the ledger keeps them accountable until an administrator
  /// clears it.
  Report { pid: String, reason: String },
}

/// What the store must persist for an accepted transition: the new custody
/// state and the ledger entry describing it, all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
  pub next:     CustodyState,
  /// The pid the ledger entry is written against.
  pub pid:      String,
  pub exchange: Exchange,
  pub comment:  String,
}

// ─── The transition function ─────────────────────────────────────────────────

/// Check `transition` against the key's current `state`.
///
/// Returns the [`Effect`] to persist, or the error to surface — in which
/// case no state may change anywhere.
pub fn apply(
  tag: &str,
  state: &CustodyState,
  transition: &Transition,
) -> Result<Effect> {
  match transition {
    Transition::Assign { pid } => match state {
      CustodyState::Available => Ok(Effect {
        next:     CustodyState::Owned { pid: pid.clone() },
        pid:      pid.clone(),
        exchange: Exchange::Acquired,
        comment:  String::new(),
      }),
      CustodyState::Owned { pid: owner } => Err(Error::AlreadyOwned {
        tag:   tag.to_string(),
        owner: owner.clone(),
      }),
    },

    Transition::Return { acting } => match state {
      CustodyState::Owned { pid } if *pid == acting.pid => Ok(Effect {
        next:     CustodyState::Available,
        pid:      pid.clone(),
        exchange: Exchange::Returned,
        comment:  String::new(),
      }),
      CustodyState::Owned { .. } => Err(Error::NotOwnedBy {
        tag: tag.to_string(),
        pid: acting.pid.clone(),
      }),
      CustodyState::Available => Err(Error::KeyUnowned(tag.to_string())),
    },

    Transition::ForceReturn { pid, acknowledged } => {
      if !acknowledged {
        return Err(Error::Unacknowledged);
      }
      match state {
        CustodyState::Owned { pid: owner } if owner == pid => Ok(Effect {
          next:     CustodyState::Available,
          pid:      pid.clone(),
          exchange: Exchange::Returned,
          comment:  "force-returned by administrator".to_string(),
        }),
        CustodyState::Owned { .. } => Err(Error::NotOwnedBy {
          tag: tag.to_string(),
          pid: pid.clone(),
        }),
        CustodyState::Available => Err(Error::KeyUnowned(tag.to_string())),
      }
    }

    Transition::Report { pid, reason } => match state {
      CustodyState::Owned { pid: owner } if owner == pid => Ok(Effect {
        next:     CustodyState::Available,
        pid:      pid.clone(),
        exchange: Exchange::Reported,
        comment:  reason.clone(),
      }),
      CustodyState::Owned { .. } => Err(Error::NotOwnedBy {
        tag: tag.to_string(),
        pid: pid.clone(),
      }),
      CustodyState::Available => Err(Error::KeyUnowned(tag.to_string())),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::user::Role;

  fn owned(pid: &str) -> CustodyState {
    CustodyState::Owned { pid: pid.to_string() }
  }

  // ── Assign ────────────────────────────────────────────────────────────────

  #[test]
  fn assign_available_key() {
    let effect = apply(
      "101",
      &CustodyState::Available,
      &Transition::Assign { pid: "jdoe".into() },
    )
    .unwrap();
    assert_eq!(effect.next, owned("jdoe"));
    assert_eq!(effect.exchange, Exchange::Acquired);
    assert_eq!(effect.pid, "jdoe");
  }

  #[test]
  fn assign_owned_key_is_a_conflict() {
    let err = apply(
      "101",
      &owned("asmith"),
      &Transition::Assign { pid: "jdoe".into() },
    )
    .unwrap_err();
    assert_eq!(
      err,
      Error::AlreadyOwned { tag: "101".into(), owner: "asmith".into() }
    );
  }

  // ── Return ────────────────────────────────────────────────────────────────

  #[test]
  fn holder_can_self_return() {
    let acting = Principal::new("jdoe", Role::Requestor);
    let effect =
      apply("101", &owned("jdoe"), &Transition::Return { acting }).unwrap();
    assert_eq!(effect.next, CustodyState::Available);
    assert_eq!(effect.exchange, Exchange::Returned);
    assert_eq!(effect.pid, "jdoe");
  }

  #[test]
  fn non_holder_cannot_self_return() {
    let acting = Principal::new("asmith", Role::Requestor);
    let err =
      apply("101", &owned("jdoe"), &Transition::Return { acting }).unwrap_err();
    assert_eq!(err, Error::NotOwnedBy { tag: "101".into(), pid: "asmith".into() });
  }

  #[test]
  fn admin_role_does_not_bypass_self_return_check() {
    // Administrators must use ForceReturn; Return is strictly self-service.
    let acting = Principal::new("adm", Role::Sudo);
    let err =
      apply("101", &owned("jdoe"), &Transition::Return { acting }).unwrap_err();
    assert_eq!(err, Error::NotOwnedBy { tag: "101".into(), pid: "adm".into() });
  }

  #[test]
  fn returning_an_available_key_fails() {
    let acting = Principal::new("jdoe", Role::Requestor);
    let err = apply("101", &CustodyState::Available, &Transition::Return { acting })
      .unwrap_err();
    assert_eq!(err, Error::KeyUnowned("101".into()));
  }

  // ── ForceReturn ───────────────────────────────────────────────────────────

  #[test]
  fn force_return_requires_acknowledgement() {
    let err = apply(
      "101",
      &owned("jdoe"),
      &Transition::ForceReturn { pid: "jdoe".into(), acknowledged: false },
    )
    .unwrap_err();
    assert_eq!(err, Error::Unacknowledged);
  }

  #[test]
  fn force_return_with_acknowledgement() {
    let effect = apply(
      "101",
      &owned("jdoe"),
      &Transition::ForceReturn { pid: "jdoe".into(), acknowledged: true },
    )
    .unwrap();
    assert_eq!(effect.next, CustodyState::Available);
    assert_eq!(effect.exchange, Exchange::Returned);
  }

  #[test]
  fn force_return_against_wrong_holder_fails() {
    let err = apply(
      "101",
      &owned("asmith"),
      &Transition::ForceReturn { pid: "jdoe".into(), acknowledged: true },
    )
    .unwrap_err();
    assert_eq!(err, Error::NotOwnedBy { tag: "101".into(), pid: "jdoe".into() });
  }

  // ── Report ────────────────────────────────────────────────────────────────

  #[test]
  fn report_embeds_the_reason() {
    let effect = apply(
      "101",
      &owned("jdoe"),
      &Transition::Report { pid: "jdoe".into(), reason: "left on the bus".into() },
    )
    .unwrap();
    assert_eq!(effect.next, CustodyState::Available);
    assert_eq!(effect.exchange, Exchange::Reported);
    assert_eq!(effect.comment, "left on the bus");
  }

  #[test]
  fn report_on_available_key_fails() {
    let err = apply(
      "101",
      &CustodyState::Available,
      &Transition::Report { pid: "jdoe".into(), reason: "gone".into() },
    )
    .unwrap_err();
    assert_eq!(err, Error::KeyUnowned("101".into()));
  }

  // ── State construction ────────────────────────────────────────────────────

  #[test]
  fn state_from_owner_column() {
    assert_eq!(CustodyState::from_owner(None), CustodyState::Available);
    assert_eq!(CustodyState::from_owner(Some("jdoe".into())), owned("jdoe"));
  }
}
