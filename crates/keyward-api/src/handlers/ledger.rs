//! Handlers for `/ledger` endpoints.
//!
//! Reading the ledger is open to any authenticated principal; writing it
//! directly is the administrator correction path, which deliberately does
//! not replay key or user state.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use keyward_core::{
  ledger::{Exchange, NewRecord, RecordPatch},
  store::CustodyStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError, reply};

fn parse_exchange(value: &str) -> Result<Exchange, ApiError> {
  value.parse().map_err(|_| {
    keyward_core::Error::Validation(format!("unknown exchange `{value}`"))
      .into()
  })
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /ledger` — all records, newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(_caller): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  let records =
    state.store.list_records().await.map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("{} record(s)", records.len()), records))
}

/// `GET /ledger/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(_caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  let record = state
    .store
    .get_record(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(keyward_core::Error::RecordNotFound(id))?;
  Ok(reply::ok(format!("record {id}"), record))
}

// ─── Correction path ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRecordBody {
  pub tag_number: String,
  pub pid:        String,
  pub date:       Option<DateTime<Utc>>,
  pub exchange:   String,
  #[serde(default)]
  pub comment:    String,
}

/// `POST /ledger` — manual append, e.g. backfilling the paper ledger.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Json(body): Json<CreateRecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let input = NewRecord {
    tag_number: body.tag_number,
    pid:        body.pid,
    date:       body.date,
    exchange:   parse_exchange(&body.exchange)?,
    comment:    body.comment,
  };
  let record =
    state.store.append_record(input).await.map_err(ApiError::from_store)?;
  let message = format!("record {} appended", record.record_id);
  Ok((StatusCode::CREATED, reply::ok(message, record)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordBody {
  pub tag_number: Option<String>,
  pub pid:        Option<String>,
  pub date:       Option<DateTime<Utc>>,
  pub exchange:   Option<String>,
  pub comment:    Option<String>,
}

/// `PATCH /ledger/{id}` — correct a record. Custody state is not replayed.
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateRecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  let patch = RecordPatch {
    tag_number: body.tag_number,
    pid:        body.pid,
    date:       body.date,
    exchange:   body.exchange.as_deref().map(parse_exchange).transpose()?,
    comment:    body.comment,
  };
  let record = state
    .store
    .update_record(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::ok(format!("record {id} updated"), record))
}

/// `DELETE /ledger/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  caller.require_admin()?;
  state
    .store
    .delete_record(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(reply::done(format!("record {id} deleted")))
}
