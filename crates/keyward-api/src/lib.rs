//! JSON REST API for Keyward.
//!
//! Exposes an axum [`Router`] backed by any
//! [`keyward_core::store::CustodyStore`]. Every response body is the
//! `{ok, message, data}` envelope; auth is gateway Basic plus a forwarded
//! `x-auth-pid` principal (see [`auth`]).

pub mod auth;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod reply;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, patch, post},
};
use keyward_core::store::CustodyStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use handlers::{email, keys, ledger, users};
use notify::Notifier;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with a
/// `KEYWARD_`-prefixed environment overlay.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  /// Seeds the persisted admin email on first start; ignored once set.
  pub admin_email:        Option<String>,
  /// Optional webhook for custody events. Log-only when absent.
  pub notify_url:         Option<String>,
  /// Pid granted the sudo role at startup, so a fresh deployment always has
  /// one account that can repair administrator assignments.
  pub bootstrap_sudo:     Option<String>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CustodyStore> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub auth:     Arc<AuthConfig>,
  pub notifier: Arc<Notifier>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CustodyStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Key registry
    .route("/keys", get(keys::list::<S>).post(keys::create::<S>))
    .route(
      "/keys/{tag}",
      get(keys::get_one::<S>)
        .patch(keys::update_one::<S>)
        .delete(keys::delete_one::<S>),
    )
    .route("/keys/{tag}/owner", get(keys::owner::<S>))
    .route("/keys/{tag}/return", patch(keys::reconcile::<S>))
    // User directory
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route("/users/name/{full_name}", get(users::by_name::<S>))
    .route(
      "/users/{pid}",
      get(users::get_one::<S>)
        .patch(users::update_one::<S>)
        .delete(users::delete_one::<S>),
    )
    // Custody
    .route("/users/{pid}/keys", get(users::owned::<S>))
    .route(
      "/users/{pid}/keys/{tag}",
      post(users::assign::<S>).delete(users::hand_back::<S>),
    )
    .route("/users/{pid}/keys/{tag}/report", post(users::report::<S>))
    // Ledger
    .route("/ledger", get(ledger::list::<S>).post(ledger::create::<S>))
    .route(
      "/ledger/{id}",
      get(ledger::get_one::<S>)
        .patch(ledger::update_one::<S>)
        .delete(ledger::delete_one::<S>),
    )
    // Settings
    .route("/email", get(email::get::<S>))
    .route("/email/{new_email}", patch(email::set::<S>))
    .route("/whoami", get(users::whoami::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
