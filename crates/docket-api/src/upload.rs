//! Handler for `POST /upload-csv`.
//!
//! Accepts `multipart/form-data` with a single `file` part. The upload
//! replaces the live dataset.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State},
};
use docket_core::store::{NewUpload, RowStore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// The multipart part carrying the CSV file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
  pub message:     String,
  pub rows_loaded: usize,
  pub upload_id:   Uuid,
}

/// `POST /upload-csv`
pub async fn handler<S>(
  State(state): State<Arc<ApiState<S>>>,
  mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
  S: RowStore,
{
  let mut file = None;
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.name() != Some(FILE_FIELD) {
      continue;
    }
    let source_name = field.file_name().unwrap_or("upload.csv").to_owned();
    let bytes = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    file = Some((source_name, bytes));
    break;
  }
  let (source_name, bytes) = file.ok_or_else(|| {
    ApiError::BadRequest(format!("missing multipart field `{FILE_FIELD}`"))
  })?;

  let rows = docket_csv::parse(&bytes).map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let content_sha256 = hex::encode(Sha256::digest(&bytes));

  let record = state
    .store
    .replace_rows(NewUpload {
      source_name,
      content_sha256,
      rows,
    })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(UploadResponse {
    message:     "CSV uploaded and indexed successfully".into(),
    rows_loaded: record.row_count,
    upload_id:   record.upload_id,
  }))
}
