//! Gateway authentication and principal resolution.
//!
//! The identity provider itself is external: the gateway fronting this
//! service signs in the end user and forwards their identity in an
//! `x-auth-pid` header (plus an optional `x-auth-name` display name). The
//! gateway authenticates *itself* to us with HTTP Basic against an argon2
//! hash from the configuration.
//!
//! A pid seen for the first time is enrolled on the spot as a requestor, so
//! the directory needs no out-of-band provisioning for ordinary users.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use keyward_core::{
  principal::Principal,
  store::{AsDomainError as _, CustodyStore},
  user::NewUser,
  validate,
};

use crate::{AppState, error::ApiError};

/// Gateway credentials accepted by this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify the gateway's Basic credentials directly from headers.
pub fn verify_auth(
  headers: &HeaderMap,
  config: &AuthConfig,
) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds =
    std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) =
    creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

/// The authenticated principal behind the current request.
///
/// Extraction checks the gateway's Basic credentials, reads the forwarded
/// pid, and resolves it against the directory — enrolling a first-time pid
/// as a requestor (with the forwarded display name when it passes
/// validation, the "NA" placeholder otherwise).
pub struct Caller(pub Principal);

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)?;

    let pid = parts
      .headers
      .get("x-auth-pid")
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::Unauthorized)?
      .to_string();
    validate::pid(&pid).map_err(|_| ApiError::Unauthorized)?;

    let user = match state
      .store
      .get_user(&pid)
      .await
      .map_err(ApiError::from_store)?
    {
      Some(user) => user,
      None => enroll(state, &pid, &parts.headers).await?,
    };

    Ok(Caller(Principal::new(user.pid, user.role)))
  }
}

/// First sighting of a pid: create a requestor record for it.
async fn enroll<S>(
  state: &AppState<S>,
  pid: &str,
  headers: &HeaderMap,
) -> Result<keyward_core::user::User, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  let mut input = NewUser::first_sighting(pid);
  if let Some(name) = headers.get("x-auth-name").and_then(|v| v.to_str().ok())
    && validate::full_name(name).is_ok()
  {
    input.full_name = name.to_string();
  }

  match state.store.add_user(input).await {
    Ok(user) => {
      tracing::info!(pid, "enrolled first-time principal");
      Ok(user)
    }
    // Lost a race with a concurrent first request from the same pid.
    Err(e)
      if matches!(e.domain(), Some(keyward_core::Error::DuplicatePid(_))) =>
    {
      state
        .store
        .get_user(pid)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| {
          ApiError::Domain(keyward_core::Error::UserNotFound(pid.to_string()))
        })
    }
    Err(e) => Err(ApiError::from_store(e)),
  }
}
