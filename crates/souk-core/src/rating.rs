//! Ratings (company → company) and reviews (user → company).
//!
//! Ratings are directional: a supplier rates an importer it dealt with. The
//! rules here mirror the store's own constraints; the store remains the
//! authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  company::{Company, CompanyRole},
};

pub const MAX_REVIEW_COMMENT_CHARS: usize = 2000;
const MAX_EVIDENCE_URLS: usize = 10;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// The invariants a rating submission must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingPolicy {
  pub min_comment_chars: usize,
  pub rater_role:        CompanyRole,
  pub target_role:       CompanyRole,
}

impl RatingPolicy {
  /// Suppliers rate importers, with a substantive comment.
  pub const STRICT: Self = Self {
    min_comment_chars: 140,
    rater_role:        CompanyRole::Supplier,
    target_role:       CompanyRole::Importer,
  };
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  pub rating_id:         Uuid,
  pub rater_id:          Uuid,
  pub target_id:         Uuid,
  pub overall:           u8,
  pub quality:           Option<u8>,
  pub timeliness:        Option<u8>,
  pub compliance:        Option<u8>,
  pub communication:     Option<u8>,
  pub importer_disputes: Vec<String>,
  pub supplier_issues:   Vec<String>,
  pub evidence_urls:     Vec<String>,
  pub comment:           String,
  pub rfq_id:            Option<Uuid>,
  pub submitted_by:      Uuid,
  pub created_at:        DateTime<Utc>,
}

/// A validated rating, ready for
/// [`MarketStore::insert_rating`](crate::store::MarketStore::insert_rating).
#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
  pub rater_id:          Uuid,
  pub target_id:         Uuid,
  pub overall:           u8,
  pub quality:           Option<u8>,
  pub timeliness:        Option<u8>,
  pub compliance:        Option<u8>,
  pub communication:     Option<u8>,
  pub importer_disputes: Vec<String>,
  pub supplier_issues:   Vec<String>,
  pub evidence_urls:     Vec<String>,
  pub comment:           String,
  pub rfq_id:            Option<Uuid>,
}

/// The raw request body. Every field is optional so that missing fields are
/// reported as [`Error::InvalidInput`] rather than as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatingSubmission {
  pub rater_id:          Option<Uuid>,
  pub target_id:         Option<Uuid>,
  pub overall:           Option<i64>,
  pub quality:           Option<i64>,
  pub timeliness:        Option<i64>,
  pub compliance:        Option<i64>,
  pub communication:     Option<i64>,
  #[serde(default)]
  pub importer_disputes: Vec<String>,
  #[serde(default)]
  pub supplier_issues:   Vec<String>,
  #[serde(default)]
  pub evidence_urls:     Vec<String>,
  pub comment:           Option<String>,
  pub rfq_id:            Option<Uuid>,
}

impl RatingSubmission {
  /// Read a submission from an untyped JSON body.
  ///
  /// The rater and target ids are compared before the other fields are
  /// parsed, so a self-rating is reported even when the rest of the body is
  /// malformed.
  pub fn from_json(body: serde_json::Value) -> Result<Self> {
    let id_at = |field: &str| {
      body
        .get(field)
        .and_then(serde_json::Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
    };
    if let (Some(rater), Some(target)) = (id_at("rater_id"), id_at("target_id"))
      && rater == target
    {
      return Err(Error::SelfReference);
    }
    serde_json::from_value(body).map_err(|e| Error::invalid(e.to_string()))
  }

  /// Validate the body alone. Self-rating is rejected before anything else.
  pub fn validate(self, policy: &RatingPolicy) -> Result<NewRating> {
    if let (Some(rater), Some(target)) = (self.rater_id, self.target_id)
      && rater == target
    {
      return Err(Error::SelfReference);
    }

    let rater_id = self.rater_id.ok_or_else(|| Error::invalid("rater_id is required"))?;
    let target_id = self.target_id.ok_or_else(|| Error::invalid("target_id is required"))?;
    let overall = self.overall.ok_or_else(|| Error::invalid("overall is required"))?;
    let overall = score("overall", overall)?;

    let comment = self.comment.unwrap_or_default().trim().to_owned();
    if comment.chars().count() < policy.min_comment_chars {
      return Err(Error::invalid(format!(
        "comment must be at least {} characters",
        policy.min_comment_chars
      )));
    }

    if self.evidence_urls.len() > MAX_EVIDENCE_URLS {
      return Err(Error::invalid(format!("at most {MAX_EVIDENCE_URLS} evidence urls")));
    }
    if let Some(bad) = self
      .evidence_urls
      .iter()
      .find(|u| !(u.starts_with("https://") || u.starts_with("http://")))
    {
      return Err(Error::invalid(format!("evidence url is not http(s): {bad:?}")));
    }

    Ok(NewRating {
      rater_id,
      target_id,
      overall,
      quality: optional_score("quality", self.quality)?,
      timeliness: optional_score("timeliness", self.timeliness)?,
      compliance: optional_score("compliance", self.compliance)?,
      communication: optional_score("communication", self.communication)?,
      importer_disputes: clean_tags(self.importer_disputes),
      supplier_issues: clean_tags(self.supplier_issues),
      evidence_urls: self.evidence_urls,
      comment,
      rfq_id: self.rfq_id,
    })
  }
}

/// Check the parties of a rating once both companies are loaded.
///
/// `actor` is the user submitting the rating.
pub fn check_rating_parties(
  actor: Uuid,
  rater: &Company,
  target: &Company,
  policy: &RatingPolicy,
) -> Result<()> {
  if rater.company_id == target.company_id || target.owner == actor {
    return Err(Error::SelfReference);
  }
  if rater.owner != actor {
    return Err(Error::NotOwner(rater.company_id));
  }
  if rater.role != policy.rater_role {
    return Err(Error::RoleMismatch {
      side:     "rater",
      expected: policy.rater_role,
      actual:   rater.role,
    });
  }
  if target.role != policy.target_role {
    return Err(Error::RoleMismatch {
      side:     "target",
      expected: policy.target_role,
      actual:   target.role,
    });
  }
  Ok(())
}

/// Aggregate rating figures for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
  pub company_id:    Uuid,
  pub avg_score:     Option<f64>,
  pub ratings_count: u64,
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
  pub review_id:  Uuid,
  pub company_id: Uuid,
  pub author:     Uuid,
  pub rating:     u8,
  pub comment:    Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
  #[serde(skip)]
  pub company_id: Uuid,
  pub rating:     i64,
  pub comment:    Option<String>,
}

/// A review that passed [`NewReview::validated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReview {
  pub company_id: Uuid,
  pub rating:     u8,
  pub comment:    Option<String>,
}

impl NewReview {
  pub fn validated(self) -> Result<ValidReview> {
    let rating = score("rating", self.rating)?;
    let comment = self
      .comment
      .map(|c| c.trim().to_owned())
      .filter(|c| !c.is_empty());
    if let Some(c) = &comment
      && c.chars().count() > MAX_REVIEW_COMMENT_CHARS
    {
      return Err(Error::invalid(format!(
        "comment exceeds {MAX_REVIEW_COMMENT_CHARS} characters"
      )));
    }
    Ok(ValidReview { company_id: self.company_id, rating, comment })
  }
}

/// A user may not review a company they own.
pub fn check_review_author(actor: Uuid, company: &Company) -> Result<()> {
  if company.owner == actor {
    return Err(Error::SelfReference);
  }
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn score(field: &str, value: i64) -> Result<u8> {
  match u8::try_from(value) {
    Ok(v @ 1..=5) => Ok(v),
    _ => Err(Error::invalid(format!("{field} must be between 1 and 5"))),
  }
}

fn optional_score(field: &str, value: Option<i64>) -> Result<Option<u8>> {
  value.map(|v| score(field, v)).transpose()
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
  tags
    .into_iter()
    .map(|t| t.trim().to_owned())
    .filter(|t| !t.is_empty())
    .collect()
}
