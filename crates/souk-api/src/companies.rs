//! Handlers for `/companies` and `/importers`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/companies` | Optional `?name=&role=&country=&limit=` |
//! | `POST` | `/companies` | Body: `{"name":..,"role":"supplier","country":..}` |
//! | `GET`  | `/companies/mine` | Companies owned by the session user |
//! | `GET`  | `/companies/{id}` | Profile plus rating stats |
//! | `GET`  | `/importers` | `?q=`; importers in the market country |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use souk_core::{
  Error,
  company::{Company, CompanyQuery, CompanyRole, NewCompany},
  rating::RatingStats,
  store::MarketStore,
  store_err,
};
use tracing::info;
use uuid::Uuid;

use crate::{ApiJson, ApiPath, ApiQuery, ApiState, CurrentUser, error::ApiError};

pub const IMPORTER_DIRECTORY_LIMIT: usize = 50;

// ─── List / search ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub name:    Option<String>,
  pub role:    Option<CompanyRole>,
  pub country: Option<String>,
  pub limit:   Option<usize>,
}

/// `GET /companies`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Company>>, ApiError>
where
  S: MarketStore + 'static,
{
  let query = CompanyQuery {
    name:    params.name,
    role:    params.role,
    country: params.country.map(|c| c.trim().to_uppercase()),
    limit:   params.limit,
  };
  let companies = state.store.search_companies(&query).await.map_err(store_err)?;
  Ok(Json(companies))
}

#[derive(Debug, Deserialize)]
pub struct ImporterParams {
  pub q: Option<String>,
}

/// `GET /importers?q=`
///
/// The role and country are fixed; only the name filter comes from the caller.
pub async fn importers<S>(
  State(state): State<ApiState<S>>,
  ApiQuery(params): ApiQuery<ImporterParams>,
) -> Result<Json<Vec<Company>>, ApiError>
where
  S: MarketStore + 'static,
{
  let query = CompanyQuery {
    name:    params.q.map(|q| q.trim().to_owned()).filter(|q| !q.is_empty()),
    role:    Some(CompanyRole::Importer),
    country: Some(state.config.market_country.clone()),
    limit:   Some(IMPORTER_DIRECTORY_LIMIT),
  };
  let companies = state.store.search_companies(&query).await.map_err(store_err)?;
  Ok(Json(companies))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /companies`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  ApiJson(body): ApiJson<NewCompany>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let session = current.require()?;
  let input = body.validated()?;
  let company = state
    .store
    .create_company(session.user_id, input)
    .await
    .map_err(store_err)?;
  info!(company = %company.company_id, owner = %session.user_id, role = %company.role, "company created");
  Ok((StatusCode::CREATED, Json(company)))
}

/// `GET /companies/mine`
pub async fn mine<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<Json<Vec<Company>>, ApiError>
where
  S: MarketStore + 'static,
{
  let session = current.require()?;
  let companies = state
    .store
    .companies_owned_by(session.user_id)
    .await
    .map_err(store_err)?;
  Ok(Json(companies))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CompanyProfile {
  #[serde(flatten)]
  pub company: Company,
  pub stats:   RatingStats,
}

/// `GET /companies/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CompanyProfile>, ApiError>
where
  S: MarketStore + 'static,
{
  let company = load_company(&*state.store, id).await?;
  let stats = state.store.rating_stats(id).await.map_err(store_err)?;
  Ok(Json(CompanyProfile { company, stats }))
}

/// Fetch a company or fail with `NotFound`.
pub(crate) async fn load_company<S: MarketStore>(store: &S, id: Uuid) -> Result<Company, ApiError> {
  Ok(
    store
      .get_company(id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found("company", id))?,
  )
}
