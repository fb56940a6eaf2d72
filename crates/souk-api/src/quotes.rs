//! Handlers for quotes.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/quotes` | Every quote from the caller's companies, newest first |
//! | `GET`   | `/rfqs/{id}/quotes` | Buyer side sees all; suppliers see their own |
//! | `POST`  | `/rfqs/{id}/quotes` | Body: `{"supplier_id":..,"price":..}`; honours `Idempotency-Key` |
//! | `PATCH` | `/quotes/{id}` | Body: `{"status":"accepted"\|"rejected"}`; buyer owner only |

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use serde::Deserialize;
use souk_core::{
  Error,
  access::{AccessModel, Operation},
  quote::{NewQuote, Quote, QuoteStatus},
  store::MarketStore,
  store_err,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  ApiJson, ApiPath, ApiState, CurrentUser, created_response, error::ApiError, idempotency_key,
  rfqs::load_rfq,
};

/// `GET /quotes`
pub async fn mine<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<Json<Vec<Quote>>, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  let owned: Vec<Uuid> = actor.owned_companies.iter().copied().collect();
  let quotes = state.store.quotes_by_suppliers(owned).await.map_err(store_err)?;
  Ok(Json(quotes))
}

/// `GET /rfqs/{id}/quotes`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(rfq_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Quote>>, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store)
    .check(current.session(), rfq_id, Operation::View)
    .await?;
  let quotes = state.store.quotes_for_rfq(rfq_id).await.map_err(store_err)?;

  let buyer_side = access.participation.is_some_and(|p| p.is_buyer_side());
  let visible = quotes
    .into_iter()
    .filter(|q| buyer_side || access.actor.owns(q.supplier_id))
    .collect();
  Ok(Json(visible))
}

/// `POST /rfqs/{id}/quotes`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  headers: HeaderMap,
  ApiPath(rfq_id): ApiPath<Uuid>,
  body: Result<ApiJson<NewQuote>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let session = current.require()?;
  let ApiJson(mut body) = body?;
  body.rfq_id = rfq_id;
  let mut input = body.validated()?;
  let access = AccessModel::new(&*state.store)
    .check(
      Some(session),
      rfq_id,
      Operation::SubmitQuote { supplier_id: input.supplier_id },
    )
    .await?;
  input.idempotency_key = idempotency_key(&headers)?;

  let created = state
    .store
    .create_quote(access.actor.user_id, input)
    .await
    .map_err(store_err)?;
  if !created.replayed {
    info!(
      quote = %created.value.quote_id,
      rfq = %rfq_id,
      supplier = %created.value.supplier_id,
      "quote submitted"
    );
  }
  Ok(created_response(created))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: QuoteStatus,
}

/// `PATCH /quotes/{id}`
pub async fn set_status<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(quote_id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<Quote>, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  if body.status == QuoteStatus::Sent {
    return Err(ApiError::invalid("status can only be set to accepted or rejected"));
  }

  let quote = state
    .store
    .get_quote(quote_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::not_found("quote", quote_id))?;
  let rfq = load_rfq(&*state.store, quote.rfq_id).await?;
  if !actor.owns(rfq.buyer_company_id) {
    return Err(Error::NotOwner(rfq.buyer_company_id).into());
  }

  let quote = state
    .store
    .set_quote_status(quote_id, actor.user_id, body.status)
    .await
    .map_err(store_err)?;
  info!(quote = %quote_id, status = %quote.status, "quote status changed");
  Ok(Json(quote))
}
