//! Error type for `souk-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] souk_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// A policy trigger or CHECK constraint refused the write. Holds SQLite's
  /// message unchanged.
  #[error("{0}")]
  Policy(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {what}: {value:?}")]
  Decode { what: &'static str, value: String },
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, Some(msg))) =
      &e
      && failure.code == rusqlite::ErrorCode::ConstraintViolation
    {
      if msg.starts_with("UNIQUE constraint failed") {
        return Self::Conflict(msg.clone());
      }
      if msg.starts_with("FOREIGN KEY constraint failed") {
        return Self::Core(souk_core::Error::invalid("referenced record does not exist"));
      }
      return Self::Policy(msg.clone());
    }
    Self::Database(e)
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { tokio_rusqlite::Error::Rusqlite(e).into() }
}

impl From<Error> for souk_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::Policy(msg) => Self::BackendRejected(msg),
      Error::Conflict(msg) => Self::Conflict(msg),
      other => Self::Store(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
