//! [`SqliteStore`], the SQLite implementation of [`RowStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use docket_core::store::{Dataset, NewUpload, RowStore, UploadRecord};

use crate::{
  Result,
  encode::{
    RawRow, RawUpload, encode_count, encode_dt, encode_fields, encode_row_index, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Docket row store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RowStore impl ───────────────────────────────────────────────────────────

impl RowStore for SqliteStore {
  type Error = crate::Error;

  async fn replace_rows(&self, upload: NewUpload) -> Result<UploadRecord> {
    let record = UploadRecord {
      upload_id:      Uuid::new_v4(),
      uploaded_at:    Utc::now(),
      source_name:    upload.source_name,
      content_sha256: upload.content_sha256,
      row_count:      upload.rows.len(),
    };

    let id_str    = encode_uuid(record.upload_id);
    let at_str    = encode_dt(record.uploaded_at);
    let name      = record.source_name.clone();
    let sha       = record.content_sha256.clone();
    let row_count = encode_count(record.row_count)?;
    let encoded   = upload
      .rows
      .iter()
      .map(|r| -> Result<_> {
        Ok((
          encode_count(r.position)?,
          encode_row_index(r.csv_row_index)?,
          encode_fields(&r.fields)?,
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Rows go with their upload via ON DELETE CASCADE.
        tx.execute("DELETE FROM uploads", [])?;
        tx.execute(
          "INSERT INTO uploads (upload_id, uploaded_at, source_name, content_sha256, row_count)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, at_str, name, sha, row_count],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO rows (upload_id, position, csv_row_index, fields_json)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (position, csv_row_index, fields_json) in &encoded {
            stmt.execute(rusqlite::params![id_str, position, csv_row_index, fields_json])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(
      upload_id = %record.upload_id,
      rows = record.row_count,
      source = %record.source_name,
      "replaced dataset"
    );
    Ok(record)
  }

  async fn latest_upload(&self) -> Result<Option<UploadRecord>> {
    let raw: Option<RawUpload> = self
      .conn
      .call(|conn| Ok(conn.query_row(SELECT_LATEST_UPLOAD, [], read_upload).optional()?))
      .await?;

    raw.map(RawUpload::into_record).transpose()
  }

  async fn latest_dataset(&self) -> Result<Option<Dataset>> {
    let raw: Option<(RawUpload, Vec<RawRow>)> = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let Some(upload) = tx
          .query_row(SELECT_LATEST_UPLOAD, [], read_upload)
          .optional()?
        else {
          return Ok(None);
        };
        let rows = {
          let mut stmt = tx.prepare(
            "SELECT position, csv_row_index, fields_json
             FROM rows WHERE upload_id = ?1 ORDER BY position",
          )?;
          stmt
            .query_map(rusqlite::params![upload.upload_id], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(Some((upload, rows)))
      })
      .await?;

    let Some((upload, rows)) = raw else {
      return Ok(None);
    };
    Ok(Some(Dataset {
      upload: upload.into_record()?,
      rows:   rows.into_iter().map(RawRow::into_row).collect::<Result<_>>()?,
    }))
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────

const SELECT_LATEST_UPLOAD: &str =
  "SELECT upload_id, uploaded_at, source_name, content_sha256, row_count
   FROM uploads ORDER BY uploaded_at DESC LIMIT 1";

fn read_upload(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUpload> {
  Ok(RawUpload {
    upload_id:      row.get(0)?,
    uploaded_at:    row.get(1)?,
    source_name:    row.get(2)?,
    content_sha256: row.get(3)?,
    row_count:      row.get(4)?,
  })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
  Ok(RawRow {
    position:      row.get(0)?,
    csv_row_index: row.get(1)?,
    fields_json:   row.get(2)?,
  })
}
