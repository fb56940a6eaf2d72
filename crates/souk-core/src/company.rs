//! Companies: the tenant profiles that buy, sell, quote and get rated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Which side of the marketplace a company trades on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CompanyRole {
  Importer,
  Supplier,
}

/// A company profile. Owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
  pub company_id: Uuid,
  pub owner:      Uuid,
  pub name:       String,
  pub country:    Option<String>,
  pub role:       CompanyRole,
  pub score:      Option<f64>,
  pub kyc_level:  i64,
  pub created_at: DateTime<Utc>,
}

/// Input for creating a company; the owner comes from the session.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
  pub name:    String,
  pub country: Option<String>,
  pub role:    CompanyRole,
}

impl NewCompany {
  /// Trim fields and check the minimum name length.
  pub fn validated(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    if self.name.chars().count() < 2 {
      return Err(Error::invalid("company name must be at least 2 characters"));
    }
    self.country = self
      .country
      .map(|c| c.trim().to_uppercase())
      .filter(|c| !c.is_empty());
    Ok(self)
  }
}

/// Parameters for [`MarketStore::search_companies`](crate::store::MarketStore::search_companies).
#[derive(Debug, Clone, Default)]
pub struct CompanyQuery {
  /// Case-insensitive substring match on the company name.
  pub name:    Option<String>,
  pub role:    Option<CompanyRole>,
  pub country: Option<String>,
  pub limit:   Option<usize>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn role_text_form_is_lowercase() {
    assert_eq!(CompanyRole::Supplier.to_string(), "supplier");
    assert_eq!(CompanyRole::from_str("importer").unwrap(), CompanyRole::Importer);
    assert!(CompanyRole::from_str("broker").is_err());
  }

  #[test]
  fn short_company_name_is_rejected() {
    let input = NewCompany { name: " a ".into(), country: None, role: CompanyRole::Importer };
    assert!(matches!(input.validated(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn country_is_normalised() {
    let input = NewCompany {
      name:    "Atlas Foods".into(),
      country: Some(" dz ".into()),
      role:    CompanyRole::Importer,
    };
    let input = input.validated().unwrap();
    assert_eq!(input.country.as_deref(), Some("DZ"));

    let blank = NewCompany { name: "Atlas".into(), country: Some("  ".into()), role: CompanyRole::Supplier };
    assert_eq!(blank.validated().unwrap().country, None);
  }
}
