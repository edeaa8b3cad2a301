//! The parsed CSV row model.
//!
//! Rows are kept as raw string cells; typed views are computed on access so
//! the original values remain available as evidence.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::event::EventType;

/// Column names the lifecycle index reads.
pub mod columns {
  pub const TRANSACTION_TYPE: &str = "transaction_type";
  pub const DOCUMENT_ID: &str = "document_id";
  pub const RELATED_DOCUMENT_ID: &str = "related_document_id";
  pub const PARTNER: &str = "partner";
  pub const STATUS: &str = "status";
  pub const EXPECTED_DATE: &str = "expected_date";
  pub const ACTUAL_DATE: &str = "actual_date";
  pub const CSV_ROW_INDEX: &str = "csv_row_index";
}

/// One uploaded EDI row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdiRow {
  /// 0-based position in the uploaded file, excluding the header.
  pub position:      usize,
  /// Explicit `csv_row_index` column, when present and integral.
  pub csv_row_index: Option<u64>,
  /// Non-blank cells keyed by header name.
  pub fields:        BTreeMap<String, String>,
}

impl EdiRow {
  /// Build a row from raw cells, dropping blank values.
  pub fn from_fields<I, K, V>(position: usize, cells: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let fields: BTreeMap<String, String> = cells
      .into_iter()
      .map(|(k, v)| (k.into().trim().to_owned(), v.into()))
      .filter(|(k, v)| !k.is_empty() && !v.trim().is_empty())
      .collect();
    let csv_row_index = fields
      .get(columns::CSV_ROW_INDEX)
      .and_then(|v| parse_integral(v));
    Self {
      position,
      csv_row_index,
      fields,
    }
  }

  pub fn get(&self, column: &str) -> Option<&str> {
    self.fields.get(column).map(|v| v.trim()).filter(|v| !v.is_empty())
  }

  /// The numeric transaction-set code. Accepts `850` and `850.0`, since
  /// spreadsheet exports often widen integer columns to floats.
  pub fn transaction_type(&self) -> Option<u16> {
    self
      .get(columns::TRANSACTION_TYPE)
      .and_then(parse_integral)
      .and_then(|n| u16::try_from(n).ok())
  }

  /// The lifecycle event type of this row, or `None` for unrelated codes.
  pub fn event_type(&self) -> Option<EventType> {
    self
      .transaction_type()
      .and_then(|code| EventType::from_transaction_code(code).ok())
  }

  pub fn document_id(&self) -> Option<&str> { self.get(columns::DOCUMENT_ID) }

  pub fn related_document_id(&self) -> Option<&str> {
    self.get(columns::RELATED_DOCUMENT_ID)
  }

  pub fn partner(&self) -> Option<&str> { self.get(columns::PARTNER) }

  pub fn status(&self) -> Option<&str> { self.get(columns::STATUS) }

  pub fn expected_date(&self) -> Option<NaiveDate> {
    self.get(columns::EXPECTED_DATE).and_then(parse_date)
  }

  pub fn actual_date(&self) -> Option<NaiveDate> {
    self.get(columns::ACTUAL_DATE).and_then(parse_date)
  }

  /// The date an event happened: the actual date when it parses, otherwise
  /// the expected date.
  pub fn event_date(&self) -> Option<NaiveDate> {
    self.actual_date().or_else(|| self.expected_date())
  }
}

/// Parse a strict `YYYY-MM-DD` date, ignoring surrounding whitespace.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_integral(value: &str) -> Option<u64> {
  let value = value.trim();
  if let Ok(n) = value.parse::<u64>() {
    return Some(n);
  }
  let f = value.parse::<f64>().ok()?;
  (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64)
    .then_some(f as u64)
}
