//! `attest-server`: serves the compliance API over HTTP.
//!
//! Settings come from an optional TOML file (`--config`, default
//! `config.toml`) overridden by `ATTEST_*` environment variables, e.g.
//! `ATTEST_PORT=9000`. See `config.example.toml` for every key.
//!
//! `attest-server --hash-password` reads a password from stdin and prints
//! the argon2 string expected in `auth_password_hash`.

use std::{
  io::BufRead,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use attest_core::certification::ExpiryPolicy;
use attest_server::{AppState, ServerConfig, auth::AuthConfig};
use attest_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Certification compliance server")]
struct Cli {
  /// TOML settings file; missing is fine when the environment covers it.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Hash a password read from stdin for `auth_password_hash`, then exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    println!("{}", hash_stdin_password()?);
    return Ok(());
  }

  let cfg = load_config(cli.config)?;
  let store = open_store(&cfg.store_path).await?;

  let app = attest_server::router(AppState {
    store:  Arc::new(store),
    auth:   Arc::new(AuthConfig {
      username:      cfg.auth_username,
      password_hash: cfg.auth_password_hash,
    }),
    policy: ExpiryPolicy::new(cfg.expiry_warning_days),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("cannot bind {address}"))?;
  tracing::info!(
    %address,
    warning_days = cfg.expiry_warning_days,
    "serving attest api"
  );
  axum::serve(listener, app).await.context("server error")
}

fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("ATTEST"))
    .build()
    .and_then(|settings| settings.try_deserialize())
    .context("invalid server configuration")
}

/// Open the database, creating its directory on first run. A leading `~/`
/// in the configured path is resolved against `$HOME`.
async fn open_store(configured: &Path) -> anyhow::Result<SqliteStore> {
  let path = match (configured.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => configured.to_path_buf(),
  };
  if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("cannot create {}", dir.display()))?;
  }

  let store = SqliteStore::open(&path)
    .await
    .with_context(|| format!("cannot open store at {}", path.display()))?;
  tracing::info!(path = %path.display(), "store ready");
  Ok(store)
}

fn hash_stdin_password() -> anyhow::Result<String> {
  eprint!("Password: ");
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\r', '\n']);

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))
}
