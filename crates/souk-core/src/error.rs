//! Error taxonomy shared by every layer.
//!
//! Each variant is a user-facing denial kind; the HTTP layer maps them to
//! status codes and stable error codes.

use thiserror::Error;
use uuid::Uuid;

use crate::company::CompanyRole;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no valid session")]
  Unauthenticated,

  #[error("{what} not found: {id}")]
  NotFound { what: &'static str, id: Uuid },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("rater and target are the same entity")]
  SelfReference,

  #[error("role mismatch: expected {expected} {side}, found {actual}")]
  RoleMismatch {
    side:     &'static str,
    expected: CompanyRole,
    actual:   CompanyRole,
  },

  #[error("the current user owns no company")]
  NoCompany,

  #[error("company {0} is not owned by the current user")]
  NotOwner(Uuid),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The store's own policy layer refused the operation. The message is the
  /// store's, unmodified.
  #[error("{0}")]
  BackendRejected(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(what: &'static str, id: Uuid) -> Self { Self::NotFound { what, id } }

  pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidInput(msg.into()) }
}

/// Convert a backend-specific store error into the shared taxonomy.
///
/// Used as `.map_err(store_err)` on results returned by a
/// [`MarketStore`](crate::store::MarketStore).
pub fn store_err<E: Into<Error>>(e: E) -> Error { e.into() }

pub type Result<T, E = Error> = std::result::Result<T, E>;
