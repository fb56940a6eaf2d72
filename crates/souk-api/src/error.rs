//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": CODE, "message": text}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use souk_core::Error as CoreError;
use thiserror::Error;
use tracing::{error, warn};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error(transparent)]
  Blob(#[from] souk_blob::Error),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn invalid(msg: impl Into<String>) -> Self { Self::Core(CoreError::invalid(msg)) }

  /// The HTTP status and stable error code for this error.
  pub fn status_and_code(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::Core(e) => match e {
        CoreError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        CoreError::SelfReference => (StatusCode::BAD_REQUEST, "SELF_RATING"),
        CoreError::RoleMismatch { .. } => (StatusCode::BAD_REQUEST, "ROLE_MISMATCH"),
        CoreError::NoCompany => (StatusCode::FORBIDDEN, "NO_COMPANY"),
        CoreError::NotOwner(_) => (StatusCode::FORBIDDEN, "NOT_COMPANY_OWNER"),
        CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        CoreError::BackendRejected(_) => (StatusCode::FORBIDDEN, "BACKEND_REJECTED"),
        CoreError::Store(_) | CoreError::Serialization(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
      },
      ApiError::Blob(e) => match e {
        souk_blob::Error::UnknownBucket(_) | souk_blob::Error::NotFound { .. } => {
          (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        souk_blob::Error::InvalidKey(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        souk_blob::Error::AlreadyExists { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        souk_blob::Error::NotPublic(_)
        | souk_blob::Error::Expired
        | souk_blob::Error::BadSignature => (StatusCode::FORBIDDEN, "INVALID_SIGNATURE"),
        souk_blob::Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
      },
      ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    let message = match (&self, status) {
      (ApiError::Core(CoreError::BackendRejected(msg)), _) => {
        warn!(%msg, "store policy rejected the request");
        msg.clone()
      }
      (_, StatusCode::INTERNAL_SERVER_ERROR) => {
        error!(error = %self, "request failed");
        "internal error".to_owned()
      }
      _ => self.to_string(),
    };
    (status, Json(json!({ "error": code, "message": message }))).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { Self::invalid(e.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(e: QueryRejection) -> Self { Self::invalid(e.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(e: PathRejection) -> Self { Self::invalid(e.body_text()) }
}
