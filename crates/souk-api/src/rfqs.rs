//! Handlers for `/rfqs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/rfqs` | RFQs the session user participates in |
//! | `POST` | `/rfqs` | Body: `{"buyer_company_id":..,"title":..}`; honours `Idempotency-Key` |
//! | `GET`  | `/rfqs/options` | `{id,label}` pairs for selection forms |
//! | `GET`  | `/rfqs/{id}` | RFQ with participation and grants |

use axum::{
  Json,
  extract::State,
  http::HeaderMap,
  response::IntoResponse,
};
use serde::Serialize;
use souk_core::{
  Error,
  access::{AccessModel, Operation, Participation, RfqGrants, authorize_for_company},
  rfq::{NewRfq, Rfq, RfqOption},
  store::MarketStore,
  store_err,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  ApiJson, ApiPath, ApiState, CurrentUser, created_response, error::ApiError, idempotency_key,
};

/// `GET /rfqs`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<Json<Vec<Rfq>>, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store);
  let actor = access.actor(current.session()).await?;
  Ok(Json(access.participating(&actor).await?.rfqs))
}

/// `GET /rfqs/options`
pub async fn options<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<Json<Vec<RfqOption>>, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store);
  let actor = access.actor(current.session()).await?;
  Ok(Json(access.participating(&actor).await?.options))
}

/// `POST /rfqs`
///
/// A user without companies is refused before anything is written.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  headers: HeaderMap,
  ApiJson(body): ApiJson<NewRfq>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  let mut input = body.validated()?;
  authorize_for_company(&actor, input.buyer_company_id)?;
  input.idempotency_key = idempotency_key(&headers)?;

  let created = state
    .store
    .create_rfq(actor.user_id, input)
    .await
    .map_err(store_err)?;
  if !created.replayed {
    info!(rfq = %created.value.rfq_id, buyer = %created.value.buyer_company_id, "rfq created");
  }
  Ok(created_response(created))
}

#[derive(Debug, Serialize)]
pub struct RfqView {
  #[serde(flatten)]
  pub rfq:           Rfq,
  pub participation: Option<Participation>,
  pub grants:        RfqGrants,
}

/// `GET /rfqs/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RfqView>, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store)
    .check(current.session(), id, Operation::View)
    .await?;
  Ok(Json(RfqView {
    rfq:           access.rfq,
    participation: access.participation,
    grants:        access.grants,
  }))
}

/// Fetch an RFQ or fail with `NotFound`.
pub(crate) async fn load_rfq<S: MarketStore>(store: &S, id: Uuid) -> Result<Rfq, ApiError> {
  Ok(
    store
      .get_rfq(id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found("rfq", id))?,
  )
}
