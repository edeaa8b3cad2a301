//! JSON REST API for Docket.
//!
//! Exposes an axum [`Router`] backed by any [`docket_core::store::RowStore`].
//! TLS, CORS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new().merge(docket_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod lifecycle;
pub mod upload;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use docket_core::{index::LifecycleIndex, store::RowStore};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use uuid::Uuid;

pub use error::ApiError;

/// Largest accepted `/upload-csv` request body.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

// ─── State ────────────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store: Arc<S>,
  /// The lifecycle index of the live upload, keyed by its `upload_id`.
  index:     Mutex<Option<(Uuid, Arc<LifecycleIndex>)>>,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      index: Mutex::new(None),
    }
  }
}

impl<S: RowStore> ApiState<S> {
  /// The index over the live upload, rebuilt only when the upload changes.
  ///
  /// `None` when nothing has been uploaded or the live upload has no rows.
  pub async fn current_index(&self) -> Result<Option<Arc<LifecycleIndex>>, ApiError> {
    let Some(upload) = self.store.latest_upload().await.map_err(ApiError::store)? else {
      return Ok(None);
    };
    if upload.row_count == 0 {
      return Ok(None);
    }

    let mut cached = self.index.lock().await;
    if let Some((id, index)) = cached.as_ref()
      && *id == upload.upload_id
    {
      return Ok(Some(index.clone()));
    }

    // The upload may have been replaced since `latest_upload`; build from
    // whichever dataset is live now, read in one piece.
    let Some(dataset) = self.store.latest_dataset().await.map_err(ApiError::store)? else {
      return Ok(None);
    };
    let upload_id = dataset.upload.upload_id;
    let index = Arc::new(LifecycleIndex::build(dataset.rows));
    if index.is_empty() {
      return Ok(None);
    }
    tracing::debug!(%upload_id, rows = index.row_count(), "rebuilt lifecycle index");
    *cached = Some((upload_id, index.clone()));
    Ok(Some(index))
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RowStore + 'static,
{
  Router::new()
    .route("/", get(root))
    // Lifecycle
    .route("/lifecycle/po-list", get(lifecycle::po_list::<S>))
    .route("/lifecycle/po/{po_id}", get(lifecycle::get_one::<S>))
    // Upload
    .route(
      "/upload-csv",
      post(upload::handler::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
    .with_state(Arc::new(ApiState::new(store)))
}

/// `GET /`
async fn root() -> Json<Value> {
  Json(json!({ "message": "Docket lifecycle backend running" }))
}
