//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 with fixed microsecond precision and a `Z` suffix,
//! so lexical order equals chronological order. Enums use their `strum` text
//! form; string lists are compact JSON; UUIDs are hyphenated lowercase.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use souk_core::{
  catalog::{Listing, Product},
  company::Company,
  kyc::KycDocument,
  message::Message,
  quote::Quote,
  rating::{Rating, Review},
  rfq::{Participant, Rfq},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_enum<T: FromStr>(what: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode { what, value: s.to_owned() })
}

fn decode_score(what: &'static str, v: i64) -> Result<u8> {
  u8::try_from(v).map_err(|_| Error::Decode { what, value: v.to_string() })
}

fn decode_opt_score(what: &'static str, v: Option<i64>) -> Result<Option<u8>> {
  v.map(|v| decode_score(what, v)).transpose()
}

pub fn encode_list(items: &[String]) -> Result<String> { Ok(serde_json::to_string(items)?) }

fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

/// Escape `%`, `_` and `\` for a `LIKE … ESCAPE '\'` pattern.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each raw type lists the columns it reads in `COLUMNS`, in `from_row` order.

pub struct RawUser {
  pub user_id:    String,
  pub email:      String,
  pub created_at: String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, email, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { user_id: row.get(0)?, email: row.get(1)?, created_at: row.get(2)? })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCompany {
  pub company_id: String,
  pub owner:      String,
  pub name:       String,
  pub country:    Option<String>,
  pub role:       String,
  pub score:      Option<f64>,
  pub kyc_level:  i64,
  pub created_at: String,
}

impl RawCompany {
  pub const COLUMNS: &'static str =
    "company_id, owner, name, country, role, score, kyc_level, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      company_id: row.get(0)?,
      owner:      row.get(1)?,
      name:       row.get(2)?,
      country:    row.get(3)?,
      role:       row.get(4)?,
      score:      row.get(5)?,
      kyc_level:  row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_company(self) -> Result<Company> {
    Ok(Company {
      company_id: decode_uuid(&self.company_id)?,
      owner:      decode_uuid(&self.owner)?,
      name:       self.name,
      country:    self.country,
      role:       decode_enum("company role", &self.role)?,
      score:      self.score,
      kyc_level:  self.kyc_level,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawRfq {
  pub rfq_id:           String,
  pub buyer_company_id: String,
  pub title:            String,
  pub description:      Option<String>,
  pub created_by:       String,
  pub created_at:       String,
}

impl RawRfq {
  pub const COLUMNS: &'static str =
    "rfq_id, buyer_company_id, title, description, created_by, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rfq_id:           row.get(0)?,
      buyer_company_id: row.get(1)?,
      title:            row.get(2)?,
      description:      row.get(3)?,
      created_by:       row.get(4)?,
      created_at:       row.get(5)?,
    })
  }

  pub fn into_rfq(self) -> Result<Rfq> {
    Ok(Rfq {
      rfq_id:           decode_uuid(&self.rfq_id)?,
      buyer_company_id: decode_uuid(&self.buyer_company_id)?,
      title:            self.title,
      description:      self.description,
      created_by:       decode_uuid(&self.created_by)?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawParticipant {
  pub rfq_id:     String,
  pub user_id:    String,
  pub role:       String,
  pub created_at: String,
}

impl RawParticipant {
  pub const COLUMNS: &'static str = "rfq_id, user_id, role, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rfq_id:     row.get(0)?,
      user_id:    row.get(1)?,
      role:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      rfq_id:     decode_uuid(&self.rfq_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      role:       decode_enum("participant role", &self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawQuote {
  pub quote_id:     String,
  pub rfq_id:       String,
  pub supplier_id:  String,
  pub price:        Option<f64>,
  pub message:      Option<String>,
  pub status:       String,
  pub submitted_by: String,
  pub created_at:   String,
}

impl RawQuote {
  pub const COLUMNS: &'static str =
    "quote_id, rfq_id, supplier_id, price, message, status, submitted_by, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      quote_id:     row.get(0)?,
      rfq_id:       row.get(1)?,
      supplier_id:  row.get(2)?,
      price:        row.get(3)?,
      message:      row.get(4)?,
      status:       row.get(5)?,
      submitted_by: row.get(6)?,
      created_at:   row.get(7)?,
    })
  }

  pub fn into_quote(self) -> Result<Quote> {
    Ok(Quote {
      quote_id:     decode_uuid(&self.quote_id)?,
      rfq_id:       decode_uuid(&self.rfq_id)?,
      supplier_id:  decode_uuid(&self.supplier_id)?,
      price:        self.price,
      message:      self.message,
      status:       decode_enum("quote status", &self.status)?,
      submitted_by: decode_uuid(&self.submitted_by)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawMessage {
  pub message_id: String,
  pub rfq_id:     String,
  pub sender:     String,
  pub body:       String,
  pub created_at: String,
}

impl RawMessage {
  pub const COLUMNS: &'static str = "message_id, rfq_id, sender, body, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id: row.get(0)?,
      rfq_id:     row.get(1)?,
      sender:     row.get(2)?,
      body:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id: decode_uuid(&self.message_id)?,
      rfq_id:     decode_uuid(&self.rfq_id)?,
      sender:     decode_uuid(&self.sender)?,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawRating {
  pub rating_id:         String,
  pub rater_id:          String,
  pub target_id:         String,
  pub overall:           i64,
  pub quality:           Option<i64>,
  pub timeliness:        Option<i64>,
  pub compliance:        Option<i64>,
  pub communication:     Option<i64>,
  pub importer_disputes: String,
  pub supplier_issues:   String,
  pub evidence_urls:     String,
  pub comment:           String,
  pub rfq_id:            Option<String>,
  pub submitted_by:      String,
  pub created_at:        String,
}

impl RawRating {
  pub const COLUMNS: &'static str = "rating_id, rater_id, target_id, overall, quality, \
     timeliness, compliance, communication, importer_disputes, supplier_issues, \
     evidence_urls, comment, rfq_id, submitted_by, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rating_id:         row.get(0)?,
      rater_id:          row.get(1)?,
      target_id:         row.get(2)?,
      overall:           row.get(3)?,
      quality:           row.get(4)?,
      timeliness:        row.get(5)?,
      compliance:        row.get(6)?,
      communication:     row.get(7)?,
      importer_disputes: row.get(8)?,
      supplier_issues:   row.get(9)?,
      evidence_urls:     row.get(10)?,
      comment:           row.get(11)?,
      rfq_id:            row.get(12)?,
      submitted_by:      row.get(13)?,
      created_at:        row.get(14)?,
    })
  }

  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      rating_id:         decode_uuid(&self.rating_id)?,
      rater_id:          decode_uuid(&self.rater_id)?,
      target_id:         decode_uuid(&self.target_id)?,
      overall:           decode_score("overall", self.overall)?,
      quality:           decode_opt_score("quality", self.quality)?,
      timeliness:        decode_opt_score("timeliness", self.timeliness)?,
      compliance:        decode_opt_score("compliance", self.compliance)?,
      communication:     decode_opt_score("communication", self.communication)?,
      importer_disputes: decode_list(&self.importer_disputes)?,
      supplier_issues:   decode_list(&self.supplier_issues)?,
      evidence_urls:     decode_list(&self.evidence_urls)?,
      comment:           self.comment,
      rfq_id:            decode_opt_uuid(self.rfq_id)?,
      submitted_by:      decode_uuid(&self.submitted_by)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReview {
  pub review_id:  String,
  pub company_id: String,
  pub author:     String,
  pub rating:     i64,
  pub comment:    Option<String>,
  pub created_at: String,
}

impl RawReview {
  pub const COLUMNS: &'static str = "review_id, company_id, author, rating, comment, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:  row.get(0)?,
      company_id: row.get(1)?,
      author:     row.get(2)?,
      rating:     row.get(3)?,
      comment:    row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:  decode_uuid(&self.review_id)?,
      company_id: decode_uuid(&self.company_id)?,
      author:     decode_uuid(&self.author)?,
      rating:     decode_score("rating", self.rating)?,
      comment:    self.comment,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawKycDocument {
  pub doc_id:       String,
  pub company_id:   String,
  pub doc_type:     String,
  pub storage_path: String,
  pub status:       String,
  pub uploaded_by:  String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawKycDocument {
  pub const COLUMNS: &'static str = "doc_id, company_id, doc_type, storage_path, status, \
     uploaded_by, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      doc_id:       row.get(0)?,
      company_id:   row.get(1)?,
      doc_type:     row.get(2)?,
      storage_path: row.get(3)?,
      status:       row.get(4)?,
      uploaded_by:  row.get(5)?,
      created_at:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_document(self) -> Result<KycDocument> {
    Ok(KycDocument {
      doc_id:       decode_uuid(&self.doc_id)?,
      company_id:   decode_uuid(&self.company_id)?,
      doc_type:     decode_enum("kyc doc type", &self.doc_type)?,
      storage_path: self.storage_path,
      status:       decode_enum("kyc status", &self.status)?,
      uploaded_by:  decode_uuid(&self.uploaded_by)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawProduct {
  pub product_id:  String,
  pub company_id:  String,
  pub name:        String,
  pub category:    Option<String>,
  pub description: Option<String>,
  pub created_by:  String,
  pub created_at:  String,
}

impl RawProduct {
  pub const COLUMNS: &'static str =
    "product_id, company_id, name, category, description, created_by, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      product_id:  row.get(0)?,
      company_id:  row.get(1)?,
      name:        row.get(2)?,
      category:    row.get(3)?,
      description: row.get(4)?,
      created_by:  row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      product_id:  decode_uuid(&self.product_id)?,
      company_id:  decode_uuid(&self.company_id)?,
      name:        self.name,
      category:    self.category,
      description: self.description,
      created_by:  decode_uuid(&self.created_by)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// A `listings` row joined with its product's name and company.
pub struct RawListing {
  pub listing_id:   String,
  pub product_id:   String,
  pub product_name: String,
  pub company_id:   String,
  pub moq:          Option<i64>,
  pub price_min:    Option<f64>,
  pub price_max:    Option<f64>,
  pub incoterm:     Option<String>,
  pub status:       String,
  pub created_by:   String,
  pub created_at:   String,
}

impl RawListing {
  /// Expects `listings l JOIN products p`.
  pub const COLUMNS: &'static str = "l.listing_id, l.product_id, p.name, p.company_id, l.moq, \
     l.price_min, l.price_max, l.incoterm, l.status, l.created_by, l.created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      listing_id:   row.get(0)?,
      product_id:   row.get(1)?,
      product_name: row.get(2)?,
      company_id:   row.get(3)?,
      moq:          row.get(4)?,
      price_min:    row.get(5)?,
      price_max:    row.get(6)?,
      incoterm:     row.get(7)?,
      status:       row.get(8)?,
      created_by:   row.get(9)?,
      created_at:   row.get(10)?,
    })
  }

  pub fn into_listing(self) -> Result<Listing> {
    Ok(Listing {
      listing_id:   decode_uuid(&self.listing_id)?,
      product_id:   decode_uuid(&self.product_id)?,
      product_name: self.product_name,
      company_id:   decode_uuid(&self.company_id)?,
      moq:          self.moq,
      price_min:    self.price_min,
      price_max:    self.price_max,
      incoterm:     self.incoterm,
      status:       decode_enum("listing status", &self.status)?,
      created_by:   decode_uuid(&self.created_by)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
