//! Product catalog and marketplace listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Products ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub product_id:  Uuid,
  pub company_id:  Uuid,
  pub name:        String,
  pub category:    Option<String>,
  pub description: Option<String>,
  pub created_by:  Uuid,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub company_id:  Uuid,
  pub name:        String,
  pub category:    Option<String>,
  pub description: Option<String>,
}

impl NewProduct {
  pub fn validated(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    if self.name.chars().count() < 2 {
      return Err(Error::invalid("product name must be at least 2 characters"));
    }
    self.category = non_blank(self.category);
    self.description = non_blank(self.description);
    Ok(self)
  }
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListingStatus {
  #[default]
  Draft,
  Active,
  Archived,
}

/// A listing joined with the name of its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
  pub listing_id:   Uuid,
  pub product_id:   Uuid,
  pub product_name: String,
  pub company_id:   Uuid,
  pub moq:          Option<i64>,
  pub price_min:    Option<f64>,
  pub price_max:    Option<f64>,
  pub incoterm:     Option<String>,
  pub status:       ListingStatus,
  pub created_by:   Uuid,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
  pub product_id: Uuid,
  pub moq:        Option<i64>,
  pub price_min:  Option<f64>,
  pub price_max:  Option<f64>,
  pub incoterm:   Option<String>,
  #[serde(default)]
  pub status:     ListingStatus,
}

impl NewListing {
  pub fn validated(mut self) -> Result<Self> {
    if let Some(moq) = self.moq
      && moq < 1
    {
      return Err(Error::invalid("moq must be at least 1"));
    }
    for price in [self.price_min, self.price_max].into_iter().flatten() {
      if !(price.is_finite() && price >= 0.0) {
        return Err(Error::invalid("prices must be non-negative numbers"));
      }
    }
    if let (Some(min), Some(max)) = (self.price_min, self.price_max)
      && min > max
    {
      return Err(Error::invalid("price_min cannot exceed price_max"));
    }
    self.incoterm = non_blank(self.incoterm).map(|i| i.to_uppercase());
    Ok(self)
  }
}

fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
