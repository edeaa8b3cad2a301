//! SQL schema for the Docket SQLite store.
//!
//! Executed once at connection startup; `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- At most one row: the live upload. Replaced wholesale on each upload.
CREATE TABLE IF NOT EXISTS uploads (
    upload_id       TEXT PRIMARY KEY,
    uploaded_at     TEXT NOT NULL,     -- RFC 3339 UTC; server-assigned
    source_name     TEXT NOT NULL,
    content_sha256  TEXT NOT NULL,
    row_count       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS rows (
    upload_id       TEXT NOT NULL REFERENCES uploads(upload_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,  -- 0-based, excluding the header
    csv_row_index   INTEGER,
    fields_json     TEXT NOT NULL,     -- JSON object of non-blank cells
    PRIMARY KEY (upload_id, position)
);

PRAGMA user_version = 1;
";
