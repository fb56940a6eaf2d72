//! Handlers for `/products` and `/listings`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use souk_core::{
  Error,
  access::{AccessModel, authorize_for_company},
  catalog::{Listing, NewListing, NewProduct, Product},
  store::MarketStore,
  store_err,
};
use uuid::Uuid;

use crate::{ApiJson, ApiQuery, ApiState, CurrentUser, companies::load_company, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CompanyFilter {
  pub company_id: Option<Uuid>,
}

/// `GET /products[?company_id=]`
pub async fn list_products<S>(
  State(state): State<ApiState<S>>,
  ApiQuery(filter): ApiQuery<CompanyFilter>,
) -> Result<Json<Vec<Product>>, ApiError>
where
  S: MarketStore + 'static,
{
  let products = state
    .store
    .list_products(filter.company_id)
    .await
    .map_err(store_err)?;
  Ok(Json(products))
}

/// `POST /products`
pub async fn create_product<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiJson(body): ApiJson<NewProduct>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  let input = body.validated()?;
  load_company(&*state.store, input.company_id).await?;
  authorize_for_company(&actor, input.company_id)?;

  let product = state
    .store
    .create_product(actor.user_id, input)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /listings[?company_id=]`
pub async fn list_listings<S>(
  State(state): State<ApiState<S>>,
  ApiQuery(filter): ApiQuery<CompanyFilter>,
) -> Result<Json<Vec<Listing>>, ApiError>
where
  S: MarketStore + 'static,
{
  let listings = state
    .store
    .list_listings(filter.company_id)
    .await
    .map_err(store_err)?;
  Ok(Json(listings))
}

/// `POST /listings`
///
/// The product's company must belong to the caller.
pub async fn create_listing<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiJson(body): ApiJson<NewListing>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let actor = AccessModel::new(&*state.store).actor(current.session()).await?;
  let input = body.validated()?;
  let product = state
    .store
    .get_product(input.product_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::not_found("product", input.product_id))?;
  authorize_for_company(&actor, product.company_id)?;

  let listing = state
    .store
    .create_listing(actor.user_id, input)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(listing)))
}
