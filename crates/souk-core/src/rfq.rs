//! RFQs, the participant roster, and participating-RFQ options.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// A buyer-initiated request for quotation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rfq {
  pub rfq_id:           Uuid,
  pub buyer_company_id: Uuid,
  pub title:            String,
  pub description:      Option<String>,
  pub created_by:       Uuid,
  pub created_at:       DateTime<Utc>,
}

/// Input for [`MarketStore::create_rfq`](crate::store::MarketStore::create_rfq).
#[derive(Debug, Clone, Deserialize)]
pub struct NewRfq {
  pub buyer_company_id: Uuid,
  pub title:            String,
  pub description:      Option<String>,
  #[serde(skip)]
  pub idempotency_key:  Option<String>,
}

impl NewRfq {
  pub fn validated(mut self) -> Result<Self> {
    self.title = self.title.trim().to_owned();
    if self.title.chars().count() < 3 {
      return Err(Error::invalid("title must be at least 3 characters"));
    }
    self.description = self
      .description
      .map(|d| d.trim().to_owned())
      .filter(|d| !d.is_empty());
    Ok(self)
  }
}

/// The role a user holds on an RFQ roster.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParticipantRole {
  Buyer,
  Supplier,
}

/// An explicit roster entry linking a user to an RFQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
  pub rfq_id:     Uuid,
  pub user_id:    Uuid,
  pub role:       ParticipantRole,
  pub created_at: DateTime<Utc>,
}

// ─── Participating-RFQ options ───────────────────────────────────────────────

/// An RFQ reference from one participation source. The title may be missing
/// when the source only knows the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfqRef {
  pub rfq_id: Uuid,
  pub title:  Option<String>,
}

impl From<&Rfq> for RfqRef {
  fn from(rfq: &Rfq) -> Self { Self { rfq_id: rfq.rfq_id, title: Some(rfq.title.clone()) } }
}

/// A selectable RFQ for message, rating and evidence forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqOption {
  pub id:    Uuid,
  pub label: String,
}

/// Union several participation sources into one list, deduplicated by id.
///
/// The first occurrence of an id wins; sources are consumed in order.
pub fn merge_rfq_options<I>(sources: I) -> Vec<RfqOption>
where
  I: IntoIterator<Item = Vec<RfqRef>>,
{
  let mut seen = HashSet::new();
  sources
    .into_iter()
    .flatten()
    .filter(|r| seen.insert(r.rfq_id))
    .map(|r| RfqOption { id: r.rfq_id, label: option_label(&r) })
    .collect()
}

fn option_label(r: &RfqRef) -> String {
  match r.title.as_deref().map(str::trim) {
    Some(t) if !t.is_empty() => t.to_owned(),
    _ => {
      let id = r.rfq_id.to_string();
      format!("{}…", &id[..8])
    }
  }
}
