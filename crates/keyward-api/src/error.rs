//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the server as the same JSON envelope the success
//! paths use: `{ok: false, message, data: null}`. The HTTP status comes from
//! the domain error's [`ErrorKind`].
//!
//! [`ErrorKind`]: keyward_core::error::ErrorKind

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use keyward_core::{error::ErrorKind, store::AsDomainError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  /// A domain refusal; the status class is derived from its kind.
  #[error(transparent)]
  Domain(#[from] keyward_core::Error),

  /// A backend failure with no domain meaning. Always a 500.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store error: recover the domain refusal when there is one,
  /// otherwise treat the failure as internal.
  pub fn from_store<E>(error: E) -> Self
  where
    E: std::error::Error + AsDomainError + Send + Sync + 'static,
  {
    match error.domain() {
      Some(domain) => ApiError::Domain(domain.clone()),
      None => ApiError::Store(Box::new(error)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Domain(e) => {
        let status = match e.kind() {
          ErrorKind::NotFound => StatusCode::NOT_FOUND,
          ErrorKind::Conflict => StatusCode::CONFLICT,
          ErrorKind::Forbidden => StatusCode::FORBIDDEN,
          ErrorKind::Validation => StatusCode::BAD_REQUEST,
          ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
      }
    };

    let body = Json(json!({ "ok": false, "message": message, "data": null }));
    let mut response = (status, body).into_response();
    if status == StatusCode::UNAUTHORIZED {
      response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"keyward\""),
      );
    }
    response
  }
}
