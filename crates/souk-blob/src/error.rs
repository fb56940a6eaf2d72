//! Error type for `souk-blob`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown bucket: {0}")]
  UnknownBucket(String),

  #[error("invalid object key: {0:?}")]
  InvalidKey(String),

  #[error("object {bucket}/{key} already exists")]
  AlreadyExists { bucket: String, key: String },

  #[error("object {bucket}/{key} not found")]
  NotFound { bucket: String, key: String },

  #[error("bucket {0} is private")]
  NotPublic(String),

  #[error("signed url has expired")]
  Expired,

  #[error("signature does not match")]
  BadSignature,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
