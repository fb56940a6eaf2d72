//! `POST /rfqs/{id}/evidence?filename=`: shipment evidence for an RFQ.
//!
//! Anyone who can view the RFQ may attach evidence. Files go to the public
//! bucket and the response carries the permanent URL.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use souk_blob::EVIDENCE_BUCKET;
use souk_core::{
  access::{AccessModel, Operation},
  storage_key::ObjectKey,
  store::MarketStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{ApiPath, ApiQuery, ApiState, CurrentUser, error::ApiError, kyc::key_nonce};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedEvidence {
  pub key:    String,
  pub url:    String,
  pub size:   u64,
  pub sha256: String,
}

pub async fn upload<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(rfq_id): ApiPath<Uuid>,
  ApiQuery(params): ApiQuery<UploadParams>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store)
    .check(current.session(), rfq_id, Operation::View)
    .await?;
  if body.is_empty() {
    return Err(ApiError::invalid("file is empty"));
  }

  let key = ObjectKey::build(
    "proofs",
    &rfq_id.to_string(),
    &params.filename,
    Utc::now(),
    &key_nonce(),
  );
  let stored = state.blobs.put(EVIDENCE_BUCKET, key.as_str(), body).await?;
  let url = state.blobs.public_url(EVIDENCE_BUCKET, &stored.key)?;
  info!(rfq = %rfq_id, user = %access.actor.user_id, key = %stored.key, "evidence uploaded");

  Ok((
    StatusCode::CREATED,
    Json(UploadedEvidence { key: stored.key, url, size: stored.size, sha256: stored.sha256 }),
  ))
}
