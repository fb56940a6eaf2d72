//! Bearer-token sessions.
//!
//! Tokens are HS256 JWTs carrying the user id and email. A request without a
//! usable token simply has no session; handlers that need one turn that into
//! [`souk_core::Error::Unauthenticated`].

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use souk_core::{store::MarketStore, user::Session, user::User};
use tracing::debug;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub:   Uuid,
  pub email: String,
  pub exp:   usize,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl SessionKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl,
    }
  }

  /// Issue a token for `user`, valid from `now` for the configured ttl.
  pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, ApiError> {
    let exp = (now + self.ttl).timestamp().max(0) as usize;
    let claims = Claims { sub: user.user_id, email: user.email.clone(), exp };
    encode(&Header::default(), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
  }

  /// Decode a token. Invalid or expired tokens yield `None`.
  pub fn verify(&self, token: &str) -> Option<Session> {
    match decode::<Claims>(token, &self.decoding, &Validation::default()) {
      Ok(data) => Some(Session { user_id: data.claims.sub, email: data.claims.email }),
      Err(e) => {
        debug!(error = %e, "ignoring unusable bearer token");
        None
      }
    }
  }

  /// The session carried by the `Authorization: Bearer` header, if any.
  pub fn from_headers(&self, headers: &HeaderMap) -> Option<Session> {
    let token = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))?;
    self.verify(token.trim())
  }
}

/// The caller's session, if they presented a valid token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Session>);

impl CurrentUser {
  pub fn session(&self) -> Option<&Session> { self.0.as_ref() }

  pub fn require(&self) -> Result<&Session, ApiError> {
    self.0.as_ref().ok_or(ApiError::Core(souk_core::Error::Unauthenticated))
  }
}

impl<S> FromRequestParts<ApiState<S>> for CurrentUser
where
  S: MarketStore + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(CurrentUser(state.sessions.from_headers(&parts.headers)))
  }
}
