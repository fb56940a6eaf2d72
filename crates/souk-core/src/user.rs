//! Users and sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An identity principal. The id never changes for the lifetime of the
/// account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

/// Input for [`MarketStore::create_user`](crate::store::MarketStore::create_user).
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  /// PHC string produced by argon2.
  pub password_hash: String,
}

/// A user together with their stored password hash. Never serialised.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

/// The authenticated caller of a request.
///
/// Handlers receive `Option<Session>`: "not logged in" is a valid state, not
/// an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub user_id: Uuid,
  pub email:   String,
}

/// Lower-case and trim an email address, rejecting obviously malformed input.
pub fn normalize_email(raw: &str) -> Option<String> {
  let email = raw.trim().to_lowercase();
  let (local, domain) = email.split_once('@')?;
  if local.is_empty() || domain.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
    return None;
  }
  Some(email)
}
