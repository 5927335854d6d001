//! Handlers for `/keys` endpoints. All administrator-only.
//!
//! | Method   | Path                   | Notes |
//! |----------|------------------------|-------|
//! | `GET`    | `/keys`                | list |
//! | `POST`   | `/keys`                | 409 on duplicate tag or series pair |
//! | `GET`    | `/keys/{tag}`          | 404 if absent |
//! | `PATCH`  | `/keys/{tag}`          | rename moves custody, never the ledger |
//! | `DELETE` | `/keys/{tag}`          | 409 while held |
//! | `GET`    | `/keys/{tag}/owner`    | 404 when available or absent |
//! | `PATCH`  | `/keys/{tag}/return`   | legacy repair; 409 while held |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use keyward_core::{
  key::{KeyPatch, KeyType, NewKey},
  store::CustodyStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError, reply};

fn parse_key_type(value: &str) -> Result<KeyType, ApiError> {
  value.parse().map_err(|_| {
    keyward_core::Error::Validation(format!("unknown key type `{value}`"))
      .into()
  })
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /keys`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let keys = state.store.list_keys().await.map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("{} key(s)", keys.len()), keys))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `key_type` arrives as a string so a bad value is a 400 in the envelope,
/// not a framework rejection.
#[derive(Debug, Deserialize)]
pub struct CreateKeyBody {
  pub tag_number:  String,
  pub series_id:   String,
  pub sequence_id: i64,
  pub building:    String,
  pub key_type:    String,
  pub location:    Vec<String>,
  #[serde(default)]
  pub comment:     String,
}

/// `POST /keys`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Json(body): Json<CreateKeyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let input = NewKey {
    tag_number:  body.tag_number,
    series_id:   body.series_id,
    sequence_id: body.sequence_id,
    building:    body.building,
    key_type:    parse_key_type(&body.key_type)?,
    location:    body.location,
    comment:     body.comment,
  };
  let key = state.store.add_key(input).await.map_err(ApiError::from_store)?;
  let message = format!("key {} added", key.tag_number);
  Ok((StatusCode::CREATED, reply::ok(message, key)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /keys/{tag}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(tag): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let key = state
    .store
    .get_key(&tag)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(keyward_core::Error::KeyNotFound(tag))?;
  Ok(reply::ok(format!("key {}", key.tag_number), key))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateKeyBody {
  pub tag_number:  Option<String>,
  pub series_id:   Option<String>,
  pub sequence_id: Option<i64>,
  pub building:    Option<String>,
  pub key_type:    Option<String>,
  pub location:    Option<Vec<String>>,
  pub comment:     Option<String>,
}

/// `PATCH /keys/{tag}`
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(tag): Path<String>,
  Json(body): Json<UpdateKeyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let patch = KeyPatch {
    tag_number:  body.tag_number,
    series_id:   body.series_id,
    sequence_id: body.sequence_id,
    building:    body.building,
    key_type:    body.key_type.as_deref().map(parse_key_type).transpose()?,
    location:    body.location,
    comment:     body.comment,
  };
  let key = state
    .store
    .update_key(&tag, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("key {} updated", key.tag_number), key))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /keys/{tag}` — refused while the key is in someone's custody.
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(tag): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  state
    .store
    .delete_key(&tag)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::done(format!("key {tag} deleted")))
}

// ─── Owner ────────────────────────────────────────────────────────────────────

/// `GET /keys/{tag}/owner` — 404 both when the key is absent and when it is
/// available; "no owner" is a lookup miss, not an error state.
pub async fn owner<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(tag): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let user = state
    .store
    .key_owner(&tag)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(keyward_core::Error::KeyUnowned(tag.clone()))?;
  Ok(reply::ok(format!("key {} is held by {}", tag, user.pid), user))
}

// ─── Reconcile ────────────────────────────────────────────────────────────────

/// `PATCH /keys/{tag}/return` — repair path for records imported from the
/// paper ledger. Availability is derived, so success is a no-op; the value
/// is the 409 naming the holder when the key is in fact still out.
pub async fn reconcile<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(tag): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  state
    .store
    .reconcile_key(&tag)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::done(format!("key {tag} is available")))
}
