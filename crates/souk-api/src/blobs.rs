//! `GET /blobs/{bucket}/{*key}`: serve stored objects.
//!
//! Public buckets are readable by anyone. Private buckets need the
//! `expires` and `sig` query parameters of a signed URL.

use axum::{
  extract::State,
  http::header,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use souk_blob::{UrlSignature, content_type_for};
use souk_core::store::MarketStore;
use tracing::debug;

use crate::{ApiPath, ApiQuery, ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SignatureParams {
  pub expires: Option<i64>,
  pub sig:     Option<String>,
}

pub async fn fetch<S>(
  State(state): State<ApiState<S>>,
  ApiPath((bucket, key)): ApiPath<(String, String)>,
  ApiQuery(params): ApiQuery<SignatureParams>,
) -> Result<Response, ApiError>
where
  S: MarketStore + 'static,
{
  let signature = match (params.expires, params.sig) {
    (Some(expires), Some(sig)) => Some(UrlSignature { expires, sig }),
    _ => None,
  };
  state
    .blobs
    .authorize_read(&bucket, &key, signature.as_ref(), Utc::now())?;

  let data = state.blobs.get(&bucket, &key).await?;
  debug!(%bucket, %key, size = data.len(), "object served");
  Ok(([(header::CONTENT_TYPE, content_type_for(&key))], data).into_response())
}
