//! HTTP server assembly for Docket.
//!
//! Wraps the [`docket_api`] router with request tracing and CORS, and owns
//! the server configuration shape.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use docket_core::store::RowStore;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DOCKET_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  /// SQLite database path; `:memory:` keeps the dataset in memory only.
  pub store_path:     PathBuf,
  /// Emit permissive CORS headers for any origin.
  pub cors_allow_any: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:           "127.0.0.1".to_string(),
      port:           8000,
      store_path:     PathBuf::from("docket.db"),
      cors_allow_any: true,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn is_in_memory(&self) -> bool { self.store_path.as_os_str() == ":memory:" }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `store`.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: RowStore + 'static,
{
  let app = docket_api::api_router(store).layer(TraceLayer::new_for_http());
  if config.cors_allow_any {
    app.layer(CorsLayer::very_permissive())
  } else {
    app
  }
}
