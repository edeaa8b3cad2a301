//! CSV codec for Docket uploads.
//!
//! Converts an uploaded CSV file into [`docket_core::row::EdiRow`]s. Pure
//! synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! let input = "transaction_type,document_id\n850,PO-1\n";
//! let rows = docket_csv::parse(input.as_bytes()).unwrap();
//! assert_eq!(rows[0].document_id(), Some("PO-1"));
//! ```

pub mod error;

use std::collections::HashSet;

use docket_core::row::EdiRow;

pub use error::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse a CSV document with a header row.
///
/// - Header names are trimmed; columns with a blank name are dropped.
/// - Short records are accepted; their missing cells are absent. Cells past
///   the last named column are ignored.
/// - An empty input, or a header with no records, yields no rows.
pub fn parse(input: &[u8]) -> Result<Vec<EdiRow>> {
  let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);

  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .from_reader(input);

  let headers: Vec<String> = reader
    .headers()?
    .iter()
    .map(|h| h.trim().to_owned())
    .collect();

  let mut seen = HashSet::new();
  for h in headers.iter().filter(|h| !h.is_empty()) {
    if !seen.insert(h.as_str()) {
      return Err(Error::DuplicateColumn(h.clone()));
    }
  }

  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record?;
    let cells = headers
      .iter()
      .zip(record.iter())
      .filter(|(h, _)| !h.is_empty())
      .map(|(h, v)| (h.as_str(), v));
    rows.push(EdiRow::from_fields(rows.len(), cells));
  }

  tracing::debug!(columns = headers.len(), rows = rows.len(), "parsed CSV upload");
  Ok(rows)
}
