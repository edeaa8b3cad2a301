//! Error types for the docket-csv codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed CSV: {0}")]
  Csv(#[from] csv::Error),

  #[error("duplicate column in header: {0:?}")]
  DuplicateColumn(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
