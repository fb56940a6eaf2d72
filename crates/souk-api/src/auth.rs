//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: `{"email":..,"password":..}`; 201 with a token |
//! | `POST` | `/auth/login` | Same body; 200 with a token |
//! | `GET`  | `/auth/me` | The session's user and owned companies |

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use souk_core::{
  Error, company::Company, store::MarketStore, store_err, user::NewUser, user::User,
  user::normalize_email,
};
use tracing::info;

use crate::{ApiJson, ApiState, CurrentUser, error::ApiError};

pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub token: String,
  pub user:  User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
  pub user:      User,
  pub companies: Vec<Company>,
}

async fn hash_password(password: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|h| h.to_string())
      .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
  })
  .await
  .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
  tokio::task::spawn_blocking(move || {
    let Ok(parsed) = PasswordHash::new(&hash) else {
      return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
  })
  .await
  .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + 'static,
{
  let email = normalize_email(&body.email).ok_or_else(|| ApiError::invalid("invalid email"))?;
  if body.password.chars().count() < MIN_PASSWORD_CHARS {
    return Err(ApiError::invalid(format!(
      "password must be at least {MIN_PASSWORD_CHARS} characters"
    )));
  }

  let password_hash = hash_password(body.password).await?;
  let user = state
    .store
    .create_user(NewUser { email, password_hash })
    .await
    .map_err(store_err)?;
  info!(user = %user.user_id, "user registered");

  let token = state.sessions.issue(&user, Utc::now())?;
  Ok((StatusCode::CREATED, Json(TokenResponse { token, user })))
}

/// `POST /auth/login`
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
pub async fn login<S>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: MarketStore + 'static,
{
  let email = normalize_email(&body.email).ok_or(Error::Unauthenticated)?;
  let creds = state
    .store
    .find_credentials(&email)
    .await
    .map_err(store_err)?
    .ok_or(Error::Unauthenticated)?;

  if !verify_password(body.password, creds.password_hash).await? {
    return Err(Error::Unauthenticated.into());
  }

  let token = state.sessions.issue(&creds.user, Utc::now())?;
  Ok(Json(TokenResponse { token, user: creds.user }))
}

/// `GET /auth/me`
pub async fn me<S>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<Json<MeResponse>, ApiError>
where
  S: MarketStore + 'static,
{
  let session = current.require()?;
  // A token can outlive its account.
  let user = state
    .store
    .get_user(session.user_id)
    .await
    .map_err(store_err)?
    .ok_or(Error::Unauthenticated)?;
  let companies = state
    .store
    .companies_owned_by(user.user_id)
    .await
    .map_err(store_err)?;
  Ok(Json(MeResponse { user, companies }))
}
