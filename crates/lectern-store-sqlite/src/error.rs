//! Error type for `lectern-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("invalid epoch-millisecond timestamp: {0}")]
  Timestamp(i64),

  /// A column held a value the decoder does not recognise.
  #[error("cannot decode {field}: {value:?}")]
  Decode {
    field: &'static str,
    value: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
