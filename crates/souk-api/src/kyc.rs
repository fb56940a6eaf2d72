//! Handlers for KYC documents.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/companies/{id}/kyc` | Raw file body; `?doc_type=&filename=` |
//! | `GET`  | `/companies/{id}/kyc` | Owner only |
//! | `GET`  | `/kyc/{doc_id}/url` | Short-lived signed URL; owner only |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souk_blob::KYC_BUCKET;
use souk_core::{
  Error,
  access::{AccessModel, authorize_for_company},
  kyc::{DocType, KycDocument, NewKycDocument},
  storage_key::ObjectKey,
  store::MarketStore,
  store_err,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  ApiPath, ApiQuery, ApiState, CurrentUser, companies::load_company, error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  #[serde(default)]
  pub doc_type: DocType,
  pub filename: String,
}

/// A short random token that makes object keys unique.
pub(crate) fn key_nonce() -> String {
  let mut nonce = Uuid::new_v4().simple().to_string();
  nonce.truncate(8);
  nonce
}

/// `POST /companies/{id}/kyc`
///
/// The object is written first; the document row points at it.
pub async fn upload<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(company_id): ApiPath<Uuid>,
  ApiQuery(params): ApiQuery<UploadParams>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  load_company(&*state.store, company_id).await?;
  authorize_for_company(&actor, company_id)?;
  if body.is_empty() {
    return Err(ApiError::invalid("file is empty"));
  }

  let key = ObjectKey::build(
    "kyc",
    &company_id.to_string(),
    &params.filename,
    Utc::now(),
    &key_nonce(),
  );
  let stored = state.blobs.put(KYC_BUCKET, key.as_str(), body).await?;

  let input = NewKycDocument {
    company_id,
    doc_type: params.doc_type,
    storage_path: key.into_string(),
  };
  let doc = match state.store.insert_kyc_document(actor.user_id, input).await {
    Ok(doc) => doc,
    Err(e) => {
      warn!(key = %stored.key, "kyc object stored without a document row");
      return Err(store_err(e).into());
    }
  };
  info!(doc = %doc.doc_id, company = %company_id, size = stored.size, "kyc document uploaded");
  Ok((StatusCode::CREATED, Json(doc)))
}

/// `GET /companies/{id}/kyc`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(company_id): ApiPath<Uuid>,
) -> Result<Json<Vec<KycDocument>>, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  load_company(&*state.store, company_id).await?;
  authorize_for_company(&actor, company_id)?;
  let docs = state.store.kyc_documents(company_id).await.map_err(store_err)?;
  Ok(Json(docs))
}

#[derive(Debug, Serialize)]
pub struct SignedUrl {
  pub url:        String,
  pub expires_at: DateTime<Utc>,
}

/// `GET /kyc/{doc_id}/url`
pub async fn signed_url<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(doc_id): ApiPath<Uuid>,
) -> Result<Json<SignedUrl>, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  let doc = state
    .store
    .get_kyc_document(doc_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::not_found("kyc document", doc_id))?;
  authorize_for_company(&actor, doc.company_id)?;

  let now = Utc::now();
  let ttl = state.config.signed_url_ttl;
  let url = state.blobs.signed_url(KYC_BUCKET, &doc.storage_path, ttl, now)?;
  let expires_at = now + chrono::Duration::seconds(ttl.as_secs() as i64);
  Ok(Json(SignedUrl { url, expires_at }))
}
