//! Request handlers, grouped by resource.

pub mod email;
pub mod keys;
pub mod ledger;
pub mod users;

use keyward_core::{ledger::LedgerRecord, store::CustodyStore};

use crate::{AppState, notify::CustodyEvent};

/// Dispatch a custody event for a committed transition and render the
/// outcome as a reply-message suffix. The transition is already durable;
/// a failed dispatch only annotates the message.
pub(crate) async fn notify_suffix<S>(
  state: &AppState<S>,
  record: &LedgerRecord,
) -> String
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  let admin_email = state.store.admin_email().await.unwrap_or_else(|e| {
    tracing::warn!(error = %e, "could not read admin email for notification");
    None
  });

  let event = CustodyEvent::from_record(record, admin_email);
  match state.notifier.dispatch(&event).await {
    Ok(()) => String::new(),
    Err(reason) => {
      tracing::warn!(%reason, "notification dispatch failed");
      format!(" (notification failed: {reason})")
    }
  }
}
