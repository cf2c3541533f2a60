//! HTTP server for attest.
//!
//! Mounts the JSON API from [`attest_api`] under `/api`, guarded by HTTP
//! Basic auth, with request tracing on every route.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use attest_core::{certification::ExpiryPolicy, store::ComplianceStore};
use axum::{Router, middleware};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ATTEST_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  pub auth_username:       String,
  pub auth_password_hash:  String,
  /// Days before expiry at which a certification counts as expiring soon.
  #[serde(default = "default_warning_days")]
  pub expiry_warning_days: u32,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/attest/attest.db") }

fn default_warning_days() -> u32 { ExpiryPolicy::DEFAULT_WARNING_DAYS }

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs from startup.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub auth:   Arc<AuthConfig>,
  pub policy: ExpiryPolicy,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ComplianceStore + 'static,
{
  let api = attest_api::api_router(state.store, state.policy)
    .layer(middleware::from_fn_with_state(state.auth, require_auth));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
