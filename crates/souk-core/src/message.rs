//! RFQ-scoped messages. Immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub message_id: Uuid,
  pub rfq_id:     Uuid,
  pub sender:     Uuid,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
  #[serde(skip)]
  pub rfq_id:          Uuid,
  pub body:            String,
  #[serde(skip)]
  pub idempotency_key: Option<String>,
}

impl NewMessage {
  pub fn validated(mut self) -> Result<Self> {
    self.body = self.body.trim().to_owned();
    if self.body.is_empty() {
      return Err(Error::invalid("message cannot be empty"));
    }
    if self.body.chars().count() > MAX_MESSAGE_CHARS {
      return Err(Error::invalid(format!("message exceeds {MAX_MESSAGE_CHARS} characters")));
    }
    Ok(self)
  }
}

/// Cursor pagination for [`MarketStore::messages_for_rfq`](crate::store::MarketStore::messages_for_rfq).
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
  pub limit:  Option<usize>,
  /// Only return messages created strictly before this instant.
  pub before: Option<DateTime<Utc>>,
}
