//! Handlers for `/users` endpoints and the custody transitions nested under
//! them.
//!
//! | Method   | Path                              | Access | Notes |
//! |----------|-----------------------------------|--------|-------|
//! | `GET`    | `/users`                          | admin  | list |
//! | `POST`   | `/users`                          | admin  | 409 duplicate pid |
//! | `GET`    | `/users/{pid}`                    | admin  | 404 if absent |
//! | `PATCH`  | `/users/{pid}`                    | auth   | role is admin-only |
//! | `DELETE` | `/users/{pid}`                    | admin  | 409 while holding keys |
//! | `GET`    | `/users/name/{full_name}`         | admin  | best-effort |
//! | `GET`    | `/users/{pid}/keys`               | auth   | own keys, or admin |
//! | `POST`   | `/users/{pid}/keys/{tag}`         | admin  | assign |
//! | `DELETE` | `/users/{pid}/keys/{tag}`         | auth   | self-return / force-return |
//! | `POST`   | `/users/{pid}/keys/{tag}/report`  | auth   | lost or stolen |
//! | `GET`    | `/whoami`                         | auth   | the caller's record |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use keyward_core::{
  custody::Transition,
  store::CustodyStore,
  user::{NewUser, Role, UserPatch},
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError, reply};

use super::notify_suffix;

fn parse_role(value: &str) -> Result<Role, ApiError> {
  value.parse().map_err(|_| {
    keyward_core::Error::Validation(format!("unknown role `{value}`")).into()
  })
}

// ─── Directory ────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let users = state.store.list_users().await.map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("{} user(s)", users.len()), users))
}

/// Role arrives as a string so a bad value is a 400 in the envelope.
#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub pid:       String,
  pub full_name: String,
  pub role:      Option<String>,
}

/// `POST /users` — force-create, e.g. a mock pid for someone without an
/// institutional login. Ordinary users enroll themselves on first request.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let input = NewUser {
    pid:       body.pid,
    full_name: body.full_name,
    role:      body.role.as_deref().map(parse_role).transpose()?.unwrap_or_default(),
  };
  let user =
    state.store.add_user(input).await.map_err(ApiError::from_store)?;
  let message = format!("user {} added", user.pid);
  Ok((StatusCode::CREATED, reply::ok(message, user)))
}

/// `GET /users/{pid}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(pid): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let user = state
    .store
    .get_user(&pid)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(keyward_core::Error::UserNotFound(pid))?;
  Ok(reply::ok(format!("user {}", user.pid), user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
  pub full_name: Option<String>,
  pub role:      Option<String>,
}

/// `PATCH /users/{pid}` — anyone may fix their own name; role changes are
/// administrator-only, and never one's own (the store refuses the
/// self-lockout).
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(pid): Path<String>,
  Json(body): Json<UpdateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  if caller.pid != pid || body.role.is_some() {
    caller.require_admin()?;
  }
  let patch = UserPatch {
    full_name: body.full_name,
    role:      body.role.as_deref().map(parse_role).transpose()?,
  };
  let user = state
    .store
    .update_user(&pid, patch, &caller)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("user {} updated", user.pid), user))
}

/// `DELETE /users/{pid}` — refused while the user still holds keys.
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(pid): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  state
    .store
    .delete_user(&pid)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::done(format!("user {pid} deleted")))
}

/// `GET /users/name/{full_name}` — best-effort: names are not unique, an
/// arbitrary match is returned.
pub async fn by_name<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(full_name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let user = state
    .store
    .get_user_by_name(&full_name)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(keyward_core::Error::NameNotFound(full_name))?;
  Ok(reply::ok(format!("user {}", user.pid), user))
}

// ─── Custody ──────────────────────────────────────────────────────────────────

/// `GET /users/{pid}/keys` — a requestor sees only their own custody.
pub async fn owned<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(pid): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  if caller.pid != pid {
    caller.require_admin()?;
  }
  let keys = state
    .store
    .owned_keys(&pid)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("{} holds {} key(s)", pid, keys.len()), keys))
}

/// `POST /users/{pid}/keys/{tag}` — assign the key into `pid`'s custody.
pub async fn assign<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((pid, tag)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let record = state
    .store
    .transition(&tag, Transition::Assign { pid: pid.clone() })
    .await
    .map_err(ApiError::from_store)?;

  let suffix = notify_suffix(&state, &record).await;
  let message = format!("key {tag} assigned to {pid}{suffix}");
  Ok((StatusCode::CREATED, reply::ok(message, record)))
}

#[derive(Debug, Deserialize)]
pub struct ReturnParams {
  pub acknowledge: Option<bool>,
}

/// `DELETE /users/{pid}/keys/{tag}` — the holder hands the key back, or an
/// administrator force-returns it on their behalf. A force-return must carry
/// `?acknowledge=true`; overriding someone's custody cannot be implied.
pub async fn hand_back<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((pid, tag)): Path<(String, String)>,
  Query(params): Query<ReturnParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  let transition = if caller.pid == pid && params.acknowledge.is_none() {
    Transition::Return { acting: caller }
  } else {
    caller.require_admin()?;
    Transition::ForceReturn {
      pid:          pid.clone(),
      acknowledged: params.acknowledge == Some(true),
    }
  };

  let record = state
    .store
    .transition(&tag, transition)
    .await
    .map_err(ApiError::from_store)?;

  let suffix = notify_suffix(&state, &record).await;
  let message = format!("key {tag} returned by {pid}{suffix}");
  Ok(reply::ok(message, record))
}

#[derive(Debug, Deserialize)]
pub struct ReportBody {
  pub reason: String,
}

/// `POST /users/{pid}/keys/{tag}/report` — the holder reports the key lost
/// or stolen. The key leaves their custody; the ledger keeps the reason.
pub async fn report<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path((pid, tag)): Path<(String, String)>,
  Json(body): Json<ReportBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  if caller.pid != pid {
    caller.require_admin()?;
  }
  let record = state
    .store
    .transition(
      &tag,
      Transition::Report { pid: pid.clone(), reason: body.reason },
    )
    .await
    .map_err(ApiError::from_store)?;

  let suffix = notify_suffix(&state, &record).await;
  let message = format!("key {tag} reported by {pid}{suffix}");
  Ok(reply::ok(message, record))
}

// ─── Whoami ───────────────────────────────────────────────────────────────────

/// `GET /whoami` — the caller's own directory record. Handy for gateways
/// that need the resolved role, and for first-sighting enrollment checks.
pub async fn whoami<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  let user = state
    .store
    .get_user(&caller.pid)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(keyward_core::Error::UserNotFound(caller.pid.clone()))?;
  Ok(reply::ok(format!("signed in as {}", user.pid), user))
}
