//! JSON REST API for the souk marketplace.
//!
//! Exposes an axum [`Router`] backed by any [`souk_core::store::MarketStore`]
//! and a [`souk_blob::BlobStore`]. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", souk_api::api_router(state))
//! ```

pub mod auth;
pub mod blobs;
pub mod catalog;
pub mod companies;
pub mod error;
pub mod evidence;
pub mod kyc;
pub mod messages;
pub mod quotes;
pub mod ratings;
pub mod reviews;
pub mod rfqs;
pub mod session;

use std::{sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{DefaultBodyLimit, FromRequest, FromRequestParts},
  http::{HeaderMap, StatusCode},
  routing::{get, post},
};
use serde::Serialize;
use souk_blob::BlobStore;
use souk_core::store::{Created, MarketStore};

pub use error::ApiError;
pub use session::{CurrentUser, SessionKeys};

// ─── State ────────────────────────────────────────────────────────────────────

/// Settings the handlers consult at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Lifetime of signed URLs for private objects.
  pub signed_url_ttl:   Duration,
  /// Country the importer directory is pinned to.
  pub market_country:   String,
  pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      signed_url_ttl:   Duration::from_secs(300),
      market_country:   "DZ".to_owned(),
      max_upload_bytes: 10 * 1024 * 1024,
    }
  }
}

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub blobs:    Arc<BlobStore>,
  pub sessions: Arc<SessionKeys>,
  pub config:   Arc<ApiConfig>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      blobs:    self.blobs.clone(),
      sessions: self.sessions.clone(),
      config:   self.config.clone(),
    }
  }
}

// ─── Extractors ───────────────────────────────────────────────────────────────

/// [`axum::Json`] with rejections reported as `INVALID_INPUT`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// [`axum::extract::Query`] with rejections reported as `INVALID_INPUT`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// [`axum::extract::Path`] with rejections reported as `INVALID_INPUT`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

// ─── Idempotency ──────────────────────────────────────────────────────────────

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";
const MAX_IDEMPOTENCY_KEY_CHARS: usize = 200;

/// Read the optional `Idempotency-Key` header.
pub fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
  let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
    return Ok(None);
  };
  let key = value
    .to_str()
    .map_err(|_| ApiError::invalid("idempotency key must be visible ASCII"))?
    .trim();
  if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_CHARS {
    return Err(ApiError::invalid(format!(
      "idempotency key must be 1 to {MAX_IDEMPOTENCY_KEY_CHARS} characters"
    )));
  }
  Ok(Some(key.to_owned()))
}

/// `201 Created` for a new row, `200 OK` for a replay.
pub fn created_response<T: Serialize>(created: Created<T>) -> (StatusCode, Json<T>) {
  let status = if created.replayed { StatusCode::OK } else { StatusCode::CREATED };
  (status, Json(created.value))
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: MarketStore + 'static,
{
  let upload_limit = state.config.max_upload_bytes;
  Router::new()
    // Auth
    .route("/auth/register", post(auth::register::<S>))
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/me", get(auth::me::<S>))
    // Companies
    .route("/companies", get(companies::list::<S>).post(companies::create::<S>))
    .route("/companies/mine", get(companies::mine::<S>))
    .route("/companies/{id}", get(companies::get_one::<S>))
    .route("/importers", get(companies::importers::<S>))
    // Ratings and reviews
    .route("/rating", post(ratings::submit::<S>))
    .route("/companies/{id}/ratings", get(ratings::list::<S>))
    .route(
      "/companies/{id}/reviews",
      get(reviews::list::<S>).post(reviews::create::<S>),
    )
    // KYC
    .route("/companies/{id}/kyc", get(kyc::list::<S>).post(kyc::upload::<S>))
    .route("/kyc/{doc_id}/url", get(kyc::signed_url::<S>))
    // RFQs
    .route("/rfqs", get(rfqs::list::<S>).post(rfqs::create::<S>))
    .route("/rfqs/options", get(rfqs::options::<S>))
    .route("/rfqs/{id}", get(rfqs::get_one::<S>))
    .route("/rfqs/{id}/quotes", get(quotes::list::<S>).post(quotes::create::<S>))
    .route("/quotes", get(quotes::mine::<S>))
    .route("/quotes/{id}", axum::routing::patch(quotes::set_status::<S>))
    .route("/messages", get(messages::inbox::<S>))
    .route(
      "/rfqs/{id}/messages",
      get(messages::list::<S>).post(messages::send::<S>),
    )
    .route("/rfqs/{id}/evidence", post(evidence::upload::<S>))
    // Catalog
    .route("/products", get(catalog::list_products::<S>).post(catalog::create_product::<S>))
    .route("/listings", get(catalog::list_listings::<S>).post(catalog::create_listing::<S>))
    // Objects
    .route("/blobs/{bucket}/{*key}", get(blobs::fetch::<S>))
    .layer(DefaultBodyLimit::max(upload_limit))
    .with_state(state)
}

#[cfg(test)]
mod tests;
