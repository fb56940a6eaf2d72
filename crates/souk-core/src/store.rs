//! The `MarketStore` trait: the contract of the relational store.
//!
//! The trait is implemented by storage backends (e.g. `souk-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//!
//! Every write that acts on behalf of a user takes that user's id. Backends
//! are expected to enforce their own row-level policies with it; the access
//! model in [`crate::access`] is a mirror of those policies, never a
//! replacement.

use std::future::Future;

use uuid::Uuid;

use crate::{
  catalog::{Listing, NewListing, NewProduct, Product},
  company::{Company, CompanyQuery, NewCompany},
  kyc::{KycDocument, NewKycDocument},
  message::{Message, MessageQuery, NewMessage},
  quote::{NewQuote, Quote, QuoteStatus},
  rating::{NewRating, Rating, RatingStats, Review, ValidReview},
  rfq::{NewRfq, Participant, ParticipantRole, Rfq},
  user::{Credentials, NewUser, User},
};

/// The outcome of an idempotent creation.
///
/// `replayed` is `true` when an earlier request with the same idempotency
/// key already created `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<T> {
  pub value:    T,
  pub replayed: bool,
}

impl<T> Created<T> {
  pub fn fresh(value: T) -> Self { Self { value, replayed: false } }

  pub fn replayed(value: T) -> Self { Self { value, replayed: true } }
}

/// Abstraction over a marketplace store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MarketStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Fails with a conflict if the email is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Companies ─────────────────────────────────────────────────────────

  fn create_company(
    &self,
    owner: Uuid,
    input: NewCompany,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  fn get_company(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  /// All companies whose `owner` is `user`, oldest first.
  fn companies_owned_by(
    &self,
    user: Uuid,
  ) -> impl Future<Output = Result<Vec<Company>, Self::Error>> + Send + '_;

  fn search_companies<'a>(
    &'a self,
    query: &'a CompanyQuery,
  ) -> impl Future<Output = Result<Vec<Company>, Self::Error>> + Send + 'a;

  fn rating_stats(
    &self,
    company: Uuid,
  ) -> impl Future<Output = Result<RatingStats, Self::Error>> + Send + '_;

  // ── RFQs and roster ───────────────────────────────────────────────────

  /// Create an RFQ and its creator's `buyer` roster row atomically.
  fn create_rfq(
    &self,
    creator: Uuid,
    input: NewRfq,
  ) -> impl Future<Output = Result<Created<Rfq>, Self::Error>> + Send + '_;

  fn get_rfq(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Rfq>, Self::Error>> + Send + '_;

  /// RFQs whose buyer company is one of `companies`, newest first.
  fn rfqs_by_buyers(
    &self,
    companies: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Rfq>, Self::Error>> + Send + '_;

  fn rfqs_by_ids(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Rfq>, Self::Error>> + Send + '_;

  /// Insert a roster row; an existing row for (rfq, user) is kept unchanged.
  fn add_participant(
    &self,
    rfq: Uuid,
    user: Uuid,
    role: ParticipantRole,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + '_;

  fn participant_role(
    &self,
    rfq: Uuid,
    user: Uuid,
  ) -> impl Future<Output = Result<Option<ParticipantRole>, Self::Error>> + Send + '_;

  /// Ids of RFQs on whose roster `user` appears.
  fn rfqs_joined_by(
    &self,
    user: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Quotes ────────────────────────────────────────────────────────────

  fn create_quote(
    &self,
    submitter: Uuid,
    input: NewQuote,
  ) -> impl Future<Output = Result<Created<Quote>, Self::Error>> + Send + '_;

  fn get_quote(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Quote>, Self::Error>> + Send + '_;

  fn quotes_for_rfq(
    &self,
    rfq: Uuid,
  ) -> impl Future<Output = Result<Vec<Quote>, Self::Error>> + Send + '_;

  /// Every quote submitted by any of `companies`, newest first.
  fn quotes_by_suppliers(
    &self,
    companies: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Quote>, Self::Error>> + Send + '_;

  /// Distinct supplier company ids that quoted on `rfq`.
  fn quoting_suppliers(
    &self,
    rfq: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Distinct RFQ ids quoted on by any of `companies`.
  fn rfqs_quoted_by(
    &self,
    companies: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Change a quote's status on behalf of `actor`.
  fn set_quote_status(
    &self,
    quote: Uuid,
    actor: Uuid,
    status: QuoteStatus,
  ) -> impl Future<Output = Result<Quote, Self::Error>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  fn send_message(
    &self,
    sender: Uuid,
    input: NewMessage,
  ) -> impl Future<Output = Result<Created<Message>, Self::Error>> + Send + '_;

  /// Messages of an RFQ, newest first.
  fn messages_for_rfq(
    &self,
    rfq: Uuid,
    query: MessageQuery,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// The latest `limit` messages across all of `rfqs`, newest first.
  fn messages_for_rfqs(
    &self,
    rfqs: Vec<Uuid>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  // ── Ratings and reviews ───────────────────────────────────────────────

  fn insert_rating(
    &self,
    submitter: Uuid,
    input: NewRating,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  fn ratings_for_company(
    &self,
    company: Uuid,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + '_;

  fn insert_review(
    &self,
    author: Uuid,
    input: ValidReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  fn reviews_for_company(
    &self,
    company: Uuid,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  // ── KYC ───────────────────────────────────────────────────────────────

  fn insert_kyc_document(
    &self,
    uploader: Uuid,
    input: NewKycDocument,
  ) -> impl Future<Output = Result<KycDocument, Self::Error>> + Send + '_;

  fn get_kyc_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<KycDocument>, Self::Error>> + Send + '_;

  /// A company's KYC documents, newest first.
  fn kyc_documents(
    &self,
    company: Uuid,
  ) -> impl Future<Output = Result<Vec<KycDocument>, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn create_product(
    &self,
    creator: Uuid,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  fn get_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  fn list_products(
    &self,
    company: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  fn create_listing(
    &self,
    creator: Uuid,
    input: NewListing,
  ) -> impl Future<Output = Result<Listing, Self::Error>> + Send + '_;

  fn list_listings(
    &self,
    company: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Listing>, Self::Error>> + Send + '_;
}
