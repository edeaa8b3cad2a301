//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! row cells a compact JSON object.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use docket_core::{row::EdiRow, store::UploadRecord};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Integers ─────────────────────────────────────────────────────────────────

pub fn encode_count(n: usize) -> Result<i64> {
  i64::try_from(n).map_err(|_| Error::OutOfRange(format!("count {n}")))
}

fn decode_count(n: i64) -> Result<usize> {
  usize::try_from(n).map_err(|_| Error::OutOfRange(format!("count {n}")))
}

pub fn encode_row_index(n: Option<u64>) -> Result<Option<i64>> {
  n.map(|v| i64::try_from(v).map_err(|_| Error::OutOfRange(format!("csv_row_index {v}"))))
    .transpose()
}

fn decode_row_index(n: Option<i64>) -> Result<Option<u64>> {
  n.map(|v| u64::try_from(v).map_err(|_| Error::OutOfRange(format!("csv_row_index {v}"))))
    .transpose()
}

// ─── Fields ───────────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &BTreeMap<String, String>) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Column values of an `uploads` row as read from SQLite.
pub struct RawUpload {
  pub upload_id:      String,
  pub uploaded_at:    String,
  pub source_name:    String,
  pub content_sha256: String,
  pub row_count:      i64,
}

impl RawUpload {
  pub fn into_record(self) -> Result<UploadRecord> {
    Ok(UploadRecord {
      upload_id:      decode_uuid(&self.upload_id)?,
      uploaded_at:    decode_dt(&self.uploaded_at)?,
      source_name:    self.source_name,
      content_sha256: self.content_sha256,
      row_count:      decode_count(self.row_count)?,
    })
  }
}

/// Column values of a `rows` row as read from SQLite.
pub struct RawRow {
  pub position:      i64,
  pub csv_row_index: Option<i64>,
  pub fields_json:   String,
}

impl RawRow {
  pub fn into_row(self) -> Result<EdiRow> {
    Ok(EdiRow {
      position:      decode_count(self.position)?,
      csv_row_index: decode_row_index(self.csv_row_index)?,
      fields:        serde_json::from_str(&self.fields_json)?,
    })
  }
}
