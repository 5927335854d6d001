//! Fire-and-forget notification dispatch.
//!
//! After a custody transition commits, the handler hands a [`CustodyEvent`]
//! to the configured [`Notifier`]. Dispatch failure is reported in the reply
//! message but never fails the request: the transition is already committed
//! and a flaky notification channel must not make it look otherwise.

use keyward_core::ledger::{Exchange, LedgerRecord};
use serde::Serialize;

/// Where custody events go. Log-only unless a webhook URL is configured.
#[derive(Clone)]
pub enum Notifier {
  Log,
  Webhook { client: reqwest::Client, url: String },
}

/// The payload describing one committed transition.
#[derive(Debug, Serialize)]
pub struct CustodyEvent {
  pub tag_number:  String,
  pub pid:         String,
  pub exchange:    Exchange,
  /// The inventory manager's address, for channels that route by it.
  pub admin_email: Option<String>,
}

impl CustodyEvent {
  pub fn from_record(
    record: &LedgerRecord,
    admin_email: Option<String>,
  ) -> Self {
    CustodyEvent {
      tag_number: record.tag_number.clone(),
      pid: record.pid.clone(),
      exchange: record.exchange,
      admin_email,
    }
  }
}

impl Notifier {
  pub fn from_url(url: Option<String>) -> Self {
    match url {
      Some(url) => {
        Notifier::Webhook { client: reqwest::Client::new(), url }
      }
      None => Notifier::Log,
    }
  }

  /// Dispatch one event. Errors are returned as text for the reply message;
  /// the caller must not propagate them as request failures.
  pub async fn dispatch(&self, event: &CustodyEvent) -> Result<(), String> {
    match self {
      Notifier::Log => {
        tracing::info!(
          tag = %event.tag_number,
          pid = %event.pid,
          exchange = %event.exchange,
          "custody event"
        );
        Ok(())
      }
      Notifier::Webhook { client, url } => client
        .post(url)
        .json(event)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map(|_| ())
        .map_err(|e| e.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use uuid::Uuid;

  #[tokio::test]
  async fn log_notifier_always_succeeds() {
    let record = LedgerRecord {
      record_id:  Uuid::new_v4(),
      tag_number: "101".into(),
      pid:        "jdoe".into(),
      date:       Utc::now(),
      exchange:   Exchange::Acquired,
      comment:    String::new(),
    };
    let event = CustodyEvent::from_record(&record, None);
    assert!(Notifier::Log.dispatch(&event).await.is_ok());
  }

  #[tokio::test]
  async fn unreachable_webhook_reports_failure() {
    // Reserved port on localhost; the connection is refused immediately.
    let notifier = Notifier::from_url(Some("http://127.0.0.1:1/hook".into()));
    let record = LedgerRecord {
      record_id:  Uuid::new_v4(),
      tag_number: "101".into(),
      pid:        "jdoe".into(),
      date:       Utc::now(),
      exchange:   Exchange::Returned,
      comment:    String::new(),
    };
    let event = CustodyEvent::from_record(&record, None);
    assert!(notifier.dispatch(&event).await.is_err());
  }
}
