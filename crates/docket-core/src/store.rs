//! The `RowStore` trait and upload metadata.
//!
//! The trait is implemented by storage backends (e.g. `docket-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::row::EdiRow;

/// Input to [`RowStore::replace_rows`].
#[derive(Debug, Clone)]
pub struct NewUpload {
  /// Original file name, if the client sent one.
  pub source_name:    String,
  /// SHA-256 hex digest of the uploaded bytes.
  pub content_sha256: String,
  pub rows:           Vec<EdiRow>,
}

/// A persisted upload. `upload_id` changes on every upload, so it doubles as
/// a cache key for anything derived from the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
  pub upload_id:      Uuid,
  pub uploaded_at:    DateTime<Utc>,
  pub source_name:    String,
  pub content_sha256: String,
  pub row_count:      usize,
}

/// An upload together with its rows, read as one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
  pub upload: UploadRecord,
  /// Rows in upload order. Always `upload.row_count` long.
  pub rows:   Vec<EdiRow>,
}

/// Abstraction over the backend holding the current dataset.
///
/// Only the latest upload is live. Replacing it is atomic: readers observe
/// either the previous dataset or the new one, never a mix.
pub trait RowStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Discard the current dataset and store `upload` in its place.
  fn replace_rows(
    &self,
    upload: NewUpload,
  ) -> impl Future<Output = Result<UploadRecord, Self::Error>> + Send + '_;

  /// The live upload record without its rows, or `None` if nothing has been
  /// uploaded yet.
  fn latest_upload(
    &self,
  ) -> impl Future<Output = Result<Option<UploadRecord>, Self::Error>> + Send + '_;

  /// The live upload and all of its rows. Both come from the same dataset
  /// even while a replacement is committing.
  fn latest_dataset(
    &self,
  ) -> impl Future<Output = Result<Option<Dataset>, Self::Error>> + Send + '_;
}
