//! The response envelope shared by every endpoint.

use axum::Json;
use serde::Serialize;

/// `{ok, message, data}` — the shape of every response body, success or
/// failure. Failures are produced by [`ApiError`](crate::error::ApiError)
/// with `ok: false` and `data: null`.
#[derive(Debug, Serialize)]
pub struct Reply<T> {
  pub ok:      bool,
  pub message: String,
  pub data:    T,
}

/// A successful reply carrying `data`.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<Reply<T>> {
  Json(Reply { ok: true, message: message.into(), data })
}

/// A successful reply with nothing to return.
pub fn done(message: impl Into<String>) -> Json<Reply<serde_json::Value>> {
  ok(message, serde_json::Value::Null)
}
