//! Quotes: a supplier company's priced response to an RFQ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuoteStatus {
  #[default]
  Sent,
  Accepted,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
  pub quote_id:     Uuid,
  pub rfq_id:       Uuid,
  pub supplier_id:  Uuid,
  pub price:        Option<f64>,
  pub message:      Option<String>,
  pub status:       QuoteStatus,
  pub submitted_by: Uuid,
  pub created_at:   DateTime<Utc>,
}

/// Input for [`MarketStore::create_quote`](crate::store::MarketStore::create_quote).
/// The RFQ id comes from the request path.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
  #[serde(skip)]
  pub rfq_id:          Uuid,
  pub supplier_id:     Uuid,
  pub price:           Option<f64>,
  pub message:         Option<String>,
  #[serde(skip)]
  pub idempotency_key: Option<String>,
}

impl NewQuote {
  pub fn validated(mut self) -> Result<Self> {
    if let Some(price) = self.price
      && !(price.is_finite() && price >= 0.0)
    {
      return Err(Error::invalid("price must be a non-negative number"));
    }
    self.message = self
      .message
      .map(|m| m.trim().to_owned())
      .filter(|m| !m.is_empty());
    Ok(self)
  }
}
