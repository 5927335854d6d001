//! Handlers for the admin-email singleton.
//!
//! One address per deployment, persisted in the store's settings table so a
//! restart does not lose it.

use axum::{
  extract::{Path, State},
  response::IntoResponse,
};
use keyward_core::store::CustodyStore;

use crate::{AppState, auth::Caller, error::ApiError, reply};

/// `GET /email`
pub async fn get<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let email =
    state.store.admin_email().await.map_err(ApiError::from_store)?;
  let message = match &email {
    Some(_) => "admin email".to_string(),
    None => "admin email is not set".to_string(),
  };
  Ok(reply::ok(message, email))
}

/// `PATCH /email/{new_email}`
pub async fn set<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(new_email): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  state
    .store
    .set_admin_email(&new_email)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::done(format!("admin email set to {new_email}")))
}
