//! Handlers for `/companies/{id}/reviews`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use souk_core::{
  rating::{NewReview, Review, check_review_author},
  store::MarketStore,
  store_err,
};
use uuid::Uuid;

use crate::{ApiJson, ApiPath, ApiState, CurrentUser, companies::load_company, error::ApiError};

/// `GET /companies/{id}/reviews`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Review>>, ApiError>
where
  S: MarketStore + 'static,
{
  load_company(&*state.store, id).await?;
  let reviews = state.store.reviews_for_company(id).await.map_err(store_err)?;
  Ok(Json(reviews))
}

/// `POST /companies/{id}/reviews`: body: `{"rating":4,"comment":".."}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(mut body): ApiJson<NewReview>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let session = current.require()?;
  body.company_id = id;
  let input = body.validated()?;
  let company = load_company(&*state.store, id).await?;
  check_review_author(session.user_id, &company)?;

  let review = state
    .store
    .insert_review(session.user_id, input)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(review)))
}
