//! keyward server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```
//! cargo run -p keyward-api --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use keyward_api::{AppState, ServerConfig, auth::AuthConfig, notify::Notifier};
use keyward_core::{
  store::CustodyStore as _,
  user::{NewUser, Role, UserPatch},
};
use keyward_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Keyward key-inventory server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = password_from_stdin()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("KEYWARD"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  bootstrap(&store, &server_cfg).await?;

  // Build application state.
  let state = AppState {
    store:    Arc::new(store),
    auth:     Arc::new(AuthConfig {
      username:      server_cfg.auth_username.clone(),
      password_hash: server_cfg.auth_password_hash.clone(),
    }),
    notifier: Arc::new(Notifier::from_url(server_cfg.notify_url.clone())),
    config:   Arc::new(server_cfg.clone()),
  };

  let app = keyward_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// One-time seeding from configuration: the persisted admin email (only
/// while unset) and the bootstrap sudo account.
async fn bootstrap(
  store: &SqliteStore,
  config: &ServerConfig,
) -> anyhow::Result<()> {
  if let Some(email) = &config.admin_email
    && store.admin_email().await?.is_none()
  {
    store
      .set_admin_email(email)
      .await
      .context("failed to seed admin email")?;
    tracing::info!(email, "seeded admin email");
  }

  if let Some(pid) = &config.bootstrap_sudo {
    match store.get_user(pid).await? {
      None => {
        let mut input = NewUser::first_sighting(pid);
        input.role = Role::Sudo;
        store
          .add_user(input)
          .await
          .context("failed to create bootstrap sudo user")?;
        tracing::info!(pid, "created bootstrap sudo user");
      }
      Some(user) if user.role != Role::Sudo => {
        // Promote on behalf of the deployment itself, not any principal.
        let operator = keyward_core::principal::Principal::new(
          "bootstrap",
          Role::Sudo,
        );
        let patch = UserPatch { full_name: None, role: Some(Role::Sudo) };
        store
          .update_user(pid, patch, &operator)
          .await
          .context("failed to promote bootstrap sudo user")?;
        tracing::info!(pid, "promoted bootstrap sudo user");
      }
      Some(_) => {}
    }
  }

  Ok(())
}

/// Read a password from stdin.
fn password_from_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
