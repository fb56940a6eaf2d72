//! KYC documents: compliance artifacts uploaded for a company.
//!
//! The file itself lives in object storage; the record keeps only its key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocType {
  #[default]
  Passport,
  IdCard,
  BusinessRegistration,
  TaxCertificate,
  Other,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KycStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycDocument {
  pub doc_id:       Uuid,
  pub company_id:   Uuid,
  pub doc_type:     DocType,
  /// Object key inside the private `kyc` bucket.
  pub storage_path: String,
  pub status:       KycStatus,
  pub uploaded_by:  Uuid,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewKycDocument {
  pub company_id:   Uuid,
  pub doc_type:     DocType,
  pub storage_path: String,
}
