//! Handlers for RFQ messages.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/messages` | Inbox: latest messages across the caller's RFQs |
//! | `GET`  | `/rfqs/{id}/messages` | Newest first; `?limit=` (≤ 200) and `?before=` cursor |
//! | `POST` | `/rfqs/{id}/messages` | Body: `{"body":".."}`; honours `Idempotency-Key` |

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use souk_core::{
  access::{AccessModel, Operation},
  message::{Message, MessageQuery, NewMessage},
  store::MarketStore,
  store_err,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  ApiJson, ApiPath, ApiQuery, ApiState, CurrentUser, created_response, error::ApiError,
  idempotency_key,
};

const INBOX_LIMIT: usize = 100;

/// `GET /messages`
pub async fn inbox<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store);
  let actor = access.actor(current.session()).await?;
  let rfqs: Vec<Uuid> = access
    .participating(&actor)
    .await?
    .options
    .into_iter()
    .map(|o| o.id)
    .collect();
  let messages = state
    .store
    .messages_for_rfqs(rfqs, INBOX_LIMIT)
    .await
    .map_err(store_err)?;
  Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit:  Option<usize>,
  pub before: Option<DateTime<Utc>>,
}

/// `GET /rfqs/{id}/messages`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(rfq_id): ApiPath<Uuid>,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: MarketStore + 'static,
{
  AccessModel::new(&*state.store)
    .check(current.session(), rfq_id, Operation::ReadMessages)
    .await?;
  let query = MessageQuery { limit: params.limit, before: params.before };
  let messages = state
    .store
    .messages_for_rfq(rfq_id, query)
    .await
    .map_err(store_err)?;
  Ok(Json(messages))
}

/// `POST /rfqs/{id}/messages`
pub async fn send<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  headers: HeaderMap,
  ApiPath(rfq_id): ApiPath<Uuid>,
  ApiJson(mut body): ApiJson<NewMessage>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let access = AccessModel::new(&*state.store)
    .check(current.session(), rfq_id, Operation::SendMessage)
    .await?;
  body.rfq_id = rfq_id;
  let mut input = body.validated()?;
  input.idempotency_key = idempotency_key(&headers)?;

  let created = state
    .store
    .send_message(access.actor.user_id, input)
    .await
    .map_err(store_err)?;
  debug!(message = %created.value.message_id, rfq = %rfq_id, replayed = created.replayed, "message sent");
  Ok(created_response(created))
}
