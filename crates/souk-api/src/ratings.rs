//! Handlers for company ratings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/rating` | Supplier rates importer; comment ≥ 140 chars |
//! | `GET`  | `/companies/{id}/ratings` | Newest first |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use souk_core::{
  rating::{Rating, RatingPolicy, RatingSubmission, check_rating_parties},
  store::MarketStore,
  store_err,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  ApiJson, ApiPath, ApiState, CurrentUser, companies::load_company, error::ApiError,
  rfqs::load_rfq,
};

/// `POST /rating`
///
/// Checks run in a fixed order: session, self-rating, body validation,
/// company and RFQ existence, ownership, role pairing. The store re-checks
/// all of it on insert.
pub async fn submit<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  body: Result<ApiJson<serde_json::Value>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let session = current.require()?;
  let ApiJson(body) = body?;
  let policy = RatingPolicy::STRICT;
  let input = RatingSubmission::from_json(body)?.validate(&policy)?;

  let rater = load_company(&*state.store, input.rater_id).await?;
  let target = load_company(&*state.store, input.target_id).await?;
  if let Some(rfq_id) = input.rfq_id {
    load_rfq(&*state.store, rfq_id).await?;
  }
  check_rating_parties(session.user_id, &rater, &target, &policy)?;

  let rating = state
    .store
    .insert_rating(session.user_id, input)
    .await
    .map_err(store_err)?;
  info!(
    rating = %rating.rating_id,
    rater = %rating.rater_id,
    target = %rating.target_id,
    "rating recorded"
  );
  Ok((StatusCode::CREATED, Json(rating)))
}

/// `GET /companies/{id}/ratings`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Rating>>, ApiError>
where
  S: MarketStore + 'static,
{
  load_company(&*state.store, id).await?;
  let ratings = state.store.ratings_for_company(id).await.map_err(store_err)?;
  Ok(Json(ratings))
}
