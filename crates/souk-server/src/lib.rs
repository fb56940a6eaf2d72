//! HTTP server wiring for souk.
//!
//! Holds the runtime configuration and assembles the top-level router: the
//! JSON API under `/api`, a health probe, and request tracing.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use serde::Deserialize;
use souk_api::{ApiConfig, ApiState, SessionKeys, api_router};
use souk_blob::BlobStore;
use souk_core::store::MarketStore;
use thiserror::Error;
use tower_http::trace::TraceLayer;

const MIN_SECRET_BYTES: usize = 32;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SOUK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                String,
  #[serde(default = "defaults::port")]
  pub port:                u16,
  /// Externally visible origin, used to build object URLs.
  #[serde(default = "defaults::base_url")]
  pub base_url:            String,
  #[serde(default = "defaults::store_path")]
  pub store_path:          PathBuf,
  #[serde(default = "defaults::blob_root")]
  pub blob_root:           PathBuf,
  /// Signs session tokens and object URLs.
  pub session_secret:      String,
  #[serde(default = "defaults::session_ttl_hours")]
  pub session_ttl_hours:   i64,
  #[serde(default = "defaults::signed_url_ttl_secs")]
  pub signed_url_ttl_secs: u64,
  #[serde(default = "defaults::market_country")]
  pub market_country:      String,
  #[serde(default = "defaults::max_upload_bytes")]
  pub max_upload_bytes:    usize,
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".to_owned() }
  pub fn port() -> u16 { 8080 }
  pub fn base_url() -> String { "http://localhost:8080".to_owned() }
  pub fn store_path() -> PathBuf { PathBuf::from("souk.db") }
  pub fn blob_root() -> PathBuf { PathBuf::from("blobs") }
  pub fn session_ttl_hours() -> i64 { 24 }
  pub fn signed_url_ttl_secs() -> u64 { 300 }
  pub fn market_country() -> String { "DZ".to_owned() }
  pub fn max_upload_bytes() -> usize { 10 * 1024 * 1024 }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("session_secret must be at least {MIN_SECRET_BYTES} bytes")]
  WeakSecret,

  #[error("{0} must be positive")]
  NonPositive(&'static str),
}

impl ServerConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.session_secret.len() < MIN_SECRET_BYTES {
      return Err(ConfigError::WeakSecret);
    }
    if self.session_ttl_hours <= 0 {
      return Err(ConfigError::NonPositive("session_ttl_hours"));
    }
    if self.signed_url_ttl_secs == 0 {
      return Err(ConfigError::NonPositive("signed_url_ttl_secs"));
    }
    Ok(())
  }

  /// Where the blob route lives from the outside.
  pub fn blob_url_prefix(&self) -> String {
    format!("{}/api/blobs", self.base_url.trim_end_matches('/'))
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      signed_url_ttl:   Duration::from_secs(self.signed_url_ttl_secs),
      market_country:   self.market_country.trim().to_uppercase(),
      max_upload_bytes: self.max_upload_bytes,
    }
  }

  pub fn session_keys(&self) -> SessionKeys {
    SessionKeys::new(
      self.session_secret.as_bytes(),
      chrono::Duration::hours(self.session_ttl_hours),
    )
  }

  pub fn blob_store(&self, root: PathBuf) -> BlobStore {
    BlobStore::new(root, &self.blob_url_prefix(), self.session_secret.as_bytes())
  }
}

/// Assemble handler state from the configuration and an opened store.
pub fn app_state<S>(cfg: &ServerConfig, store: S, blobs: BlobStore) -> ApiState<S> {
  ApiState {
    store:    Arc::new(store),
    blobs:    Arc::new(blobs),
    sessions: Arc::new(cfg.session_keys()),
    config:   Arc::new(cfg.api_config()),
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level router.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: MarketStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
