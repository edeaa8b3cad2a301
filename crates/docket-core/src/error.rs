//! Error types for `docket-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown transaction type code: {0}")]
  UnknownTransactionCode(u16),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
