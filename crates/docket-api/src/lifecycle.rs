//! Handlers for `/lifecycle` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/lifecycle/po-list` | Never fails on an empty store |
//! | `GET`  | `/lifecycle/po/{po_id}` | 404 + `detail` if unknown |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use docket_core::{
  lifecycle::{LifecycleResponse, PoListResponse},
  store::RowStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /lifecycle/po-list`
pub async fn po_list<S>(
  State(state): State<Arc<ApiState<S>>>,
) -> Result<Json<PoListResponse>, ApiError>
where
  S: RowStore,
{
  let Some(index) = state.current_index().await? else {
    return Ok(Json(PoListResponse::not_loaded()));
  };
  Ok(Json(PoListResponse {
    csv_loaded: true,
    pos:        index.po_summaries(),
  }))
}

/// `GET /lifecycle/po/{po_id}`
pub async fn get_one<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(po_id): Path<String>,
) -> Result<Json<LifecycleResponse>, ApiError>
where
  S: RowStore,
{
  let index = state
    .current_index()
    .await?
    .ok_or_else(|| ApiError::NotFound("No CSV uploaded".into()))?;
  let lifecycle = index
    .lifecycle(&po_id)
    .ok_or_else(|| ApiError::NotFound(format!("PO {po_id} not found")))?;
  tracing::debug!(%po_id, events = lifecycle.events.len(), "assembled lifecycle");
  Ok(Json(lifecycle))
}
