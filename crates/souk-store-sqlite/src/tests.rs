//! Integration tests for `SqliteStore` against an in-memory database.
//!
//! The policy tests call the store directly, without the access model, to
//! show that the triggers refuse the write on their own.

use souk_core::{
  access::{AccessModel, Operation, Participation},
  catalog::{ListingStatus, NewListing, NewProduct},
  company::{Company, CompanyQuery, CompanyRole, NewCompany},
  kyc::{DocType, NewKycDocument},
  message::{MessageQuery, NewMessage},
  quote::{NewQuote, QuoteStatus},
  rating::{NewRating, ValidReview},
  rfq::{NewRfq, ParticipantRole},
  store::MarketStore,
  user::{NewUser, Session},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str) -> Session {
  let u = s
    .create_user(NewUser { email: email.into(), password_hash: "$argon2id$stub".into() })
    .await
    .unwrap();
  Session { user_id: u.user_id, email: u.email }
}

async fn company(s: &SqliteStore, owner: &Session, name: &str, role: CompanyRole) -> Company {
  s.create_company(owner.user_id, NewCompany { name: name.into(), country: Some("DZ".into()), role })
    .await
    .unwrap()
}

fn new_rfq(buyer: Uuid, key: Option<&str>) -> NewRfq {
  NewRfq {
    buyer_company_id: buyer,
    title:            "Durum wheat, 500t".into(),
    description:      None,
    idempotency_key:  key.map(str::to_owned),
  }
}

fn new_quote(rfq: Uuid, supplier: Uuid) -> NewQuote {
  NewQuote {
    rfq_id:          rfq,
    supplier_id:     supplier,
    price:           Some(312.5),
    message:         None,
    idempotency_key: None,
  }
}

fn message(rfq: Uuid, body: &str) -> NewMessage {
  NewMessage { rfq_id: rfq, body: body.into(), idempotency_key: None }
}

fn rating(rater: Uuid, target: Uuid, comment_len: usize) -> NewRating {
  NewRating {
    rater_id:          rater,
    target_id:         target,
    overall:           4,
    quality:           Some(5),
    timeliness:        None,
    compliance:        None,
    communication:     Some(3),
    importer_disputes: vec!["late_payment".into()],
    supplier_issues:   vec![],
    evidence_urls:     vec![],
    comment:           "c".repeat(comment_len),
    rfq_id:            None,
  }
}

/// A buyer (importer) and a supplier, each owning one company, with one RFQ.
struct Deal {
  buyer:          Session,
  supplier:       Session,
  importer:       Company,
  supplier_co:    Company,
  rfq_id:         Uuid,
}

async fn deal(s: &SqliteStore) -> Deal {
  let buyer = user(s, "buyer@example.dz").await;
  let supplier = user(s, "supplier@example.tr").await;
  let importer = company(s, &buyer, "Atlas Foods", CompanyRole::Importer).await;
  let supplier_co = company(s, &supplier, "Anatolia Grain", CompanyRole::Supplier).await;
  let rfq = s.create_rfq(buyer.user_id, new_rfq(importer.company_id, None)).await.unwrap();
  Deal { buyer, supplier, importer, supplier_co, rfq_id: rfq.value.rfq_id }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
  let s = store().await;
  user(&s, "a@example.com").await;
  let err = s
    .create_user(NewUser { email: "a@example.com".into(), password_hash: "x".into() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "{err:?}");
}

#[tokio::test]
async fn credentials_carry_the_hash() {
  let s = store().await;
  let me = user(&s, "a@example.com").await;
  let creds = s.find_credentials("a@example.com").await.unwrap().unwrap();
  assert_eq!(creds.user.user_id, me.user_id);
  assert_eq!(creds.password_hash, "$argon2id$stub");
  assert!(s.find_credentials("b@example.com").await.unwrap().is_none());
}

// ─── RFQs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rfq_creation_inserts_buyer_roster_row() {
  let s = store().await;
  let d = deal(&s).await;
  let role = s.participant_role(d.rfq_id, d.buyer.user_id).await.unwrap();
  assert_eq!(role, Some(ParticipantRole::Buyer));
  assert_eq!(s.rfqs_joined_by(d.buyer.user_id).await.unwrap(), vec![d.rfq_id]);
}

#[tokio::test]
async fn rfq_for_unowned_company_is_rejected() {
  let s = store().await;
  let d = deal(&s).await;
  let err = s
    .create_rfq(d.supplier.user_id, new_rfq(d.importer.company_id, None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Policy(ref m) if m.starts_with("policy:")), "{err:?}");
  // Nothing of the failed transaction survives.
  assert!(s.rfqs_joined_by(d.supplier.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn idempotent_rfq_replay_returns_original() {
  let s = store().await;
  let d = deal(&s).await;

  let first = s
    .create_rfq(d.buyer.user_id, new_rfq(d.importer.company_id, Some("k-1")))
    .await
    .unwrap();
  let again = s
    .create_rfq(d.buyer.user_id, new_rfq(d.importer.company_id, Some("k-1")))
    .await
    .unwrap();

  assert!(!first.replayed);
  assert!(again.replayed);
  assert_eq!(first.value.rfq_id, again.value.rfq_id);
  let all = s.rfqs_by_buyers(vec![d.importer.company_id]).await.unwrap();
  assert_eq!(all.len(), 2, "the deal's rfq plus one keyed rfq");
}

#[tokio::test]
async fn supplier_roster_row_is_idempotent() {
  let s = store().await;
  let d = deal(&s).await;
  let p1 = s
    .add_participant(d.rfq_id, d.supplier.user_id, ParticipantRole::Supplier)
    .await
    .unwrap();
  let p2 = s
    .add_participant(d.rfq_id, d.supplier.user_id, ParticipantRole::Supplier)
    .await
    .unwrap();
  assert_eq!(p1, p2);
}

#[tokio::test]
async fn buyer_roster_row_requires_ownership() {
  let s = store().await;
  let d = deal(&s).await;
  let err = s
    .add_participant(d.rfq_id, d.supplier.user_id, ParticipantRole::Buyer)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");
}

// ─── Quotes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn quote_for_unowned_company_is_rejected() {
  let s = store().await;
  let d = deal(&s).await;
  let err = s
    .create_quote(d.buyer.user_id, new_quote(d.rfq_id, d.supplier_co.company_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");
}

#[tokio::test]
async fn quote_replay_and_status_change() {
  let s = store().await;
  let d = deal(&s).await;

  let mut input = new_quote(d.rfq_id, d.supplier_co.company_id);
  input.idempotency_key = Some("q-1".into());
  let q = s.create_quote(d.supplier.user_id, input.clone()).await.unwrap();
  let replay = s.create_quote(d.supplier.user_id, input).await.unwrap();
  assert!(replay.replayed);
  assert_eq!(q.value.quote_id, replay.value.quote_id);
  assert_eq!(s.quotes_for_rfq(d.rfq_id).await.unwrap().len(), 1);
  assert_eq!(
    s.quoting_suppliers(d.rfq_id).await.unwrap(),
    vec![d.supplier_co.company_id]
  );

  // Only the buyer may decide.
  let err = s
    .set_quote_status(q.value.quote_id, d.supplier.user_id, QuoteStatus::Accepted)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");

  let accepted = s
    .set_quote_status(q.value.quote_id, d.buyer.user_id, QuoteStatus::Accepted)
    .await
    .unwrap();
  assert_eq!(accepted.status, QuoteStatus::Accepted);

  let missing = s
    .set_quote_status(Uuid::new_v4(), d.buyer.user_id, QuoteStatus::Rejected)
    .await
    .unwrap_err();
  assert!(matches!(missing, Error::Core(souk_core::Error::NotFound { what: "quote", .. })));
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_participant_cannot_post() {
  let s = store().await;
  let d = deal(&s).await;
  let err = s
    .send_message(d.supplier.user_id, message(d.rfq_id, "hello"))
    .await
    .unwrap_err();
  assert!(
    matches!(err, Error::Policy(ref m) if m == "policy: sender is not a participant of this rfq"),
    "{err:?}"
  );
}

#[tokio::test]
async fn quoting_supplier_can_post() {
  let s = store().await;
  let d = deal(&s).await;
  s.create_quote(d.supplier.user_id, new_quote(d.rfq_id, d.supplier_co.company_id))
    .await
    .unwrap();
  let m = s
    .send_message(d.supplier.user_id, message(d.rfq_id, "Can ship in March."))
    .await
    .unwrap();
  assert!(!m.replayed);
  assert_eq!(m.value.sender, d.supplier.user_id);
}

#[tokio::test]
async fn message_replay_does_not_duplicate() {
  let s = store().await;
  let d = deal(&s).await;
  let mut input = message(d.rfq_id, "first");
  input.idempotency_key = Some("m-1".into());
  let a = s.send_message(d.buyer.user_id, input.clone()).await.unwrap();
  let b = s.send_message(d.buyer.user_id, input).await.unwrap();
  assert_eq!(a.value.message_id, b.value.message_id);
  let all = s.messages_for_rfq(d.rfq_id, MessageQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn messages_page_newest_first_with_cursor() {
  let s = store().await;
  let d = deal(&s).await;
  for i in 0..5 {
    s.send_message(d.buyer.user_id, message(d.rfq_id, &format!("m{i}")))
      .await
      .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
  }

  let page = s
    .messages_for_rfq(d.rfq_id, MessageQuery { limit: Some(2), before: None })
    .await
    .unwrap();
  let bodies: Vec<_> = page.iter().map(|m| m.body.as_str()).collect();
  assert_eq!(bodies, ["m4", "m3"]);

  let next = s
    .messages_for_rfq(d.rfq_id, MessageQuery { limit: Some(2), before: Some(page[1].created_at) })
    .await
    .unwrap();
  let bodies: Vec<_> = next.iter().map(|m| m.body.as_str()).collect();
  assert_eq!(bodies, ["m2", "m1"]);
}

#[tokio::test]
async fn messages_cannot_be_edited() {
  let s = store().await;
  let d = deal(&s).await;
  s.send_message(d.buyer.user_id, message(d.rfq_id, "original")).await.unwrap();
  let err = s.exec_raw("UPDATE messages SET body = 'edited'").await.unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_rating_updates_stats_and_score() {
  let s = store().await;
  let d = deal(&s).await;
  s.insert_rating(
    d.supplier.user_id,
    rating(d.supplier_co.company_id, d.importer.company_id, 150),
  )
  .await
  .unwrap();

  let stats = s.rating_stats(d.importer.company_id).await.unwrap();
  assert_eq!(stats.ratings_count, 1);
  assert_eq!(stats.avg_score, Some(4.0));

  let importer = s.get_company(d.importer.company_id).await.unwrap().unwrap();
  assert_eq!(importer.score, Some(4.0));

  let listed = s.ratings_for_company(d.importer.company_id).await.unwrap();
  assert_eq!(listed[0].importer_disputes, vec!["late_payment".to_owned()]);
}

#[tokio::test]
async fn unrated_company_has_empty_stats() {
  let s = store().await;
  let d = deal(&s).await;
  let stats = s.rating_stats(d.supplier_co.company_id).await.unwrap();
  assert_eq!(stats.ratings_count, 0);
  assert_eq!(stats.avg_score, None);
}

#[tokio::test]
async fn rating_policies_hold_without_the_access_model() {
  let s = store().await;
  let d = deal(&s).await;
  let third = user(&s, "third@example.cn").await;
  let other_supplier = company(&s, &third, "Second Supplier", CompanyRole::Supplier).await;

  let cases = [
    ("self", rating(d.supplier_co.company_id, d.supplier_co.company_id, 150)),
    ("role mismatch", rating(d.supplier_co.company_id, other_supplier.company_id, 150)),
    ("short comment", rating(d.supplier_co.company_id, d.importer.company_id, 20)),
  ];
  for (name, input) in cases {
    let err = s.insert_rating(d.supplier.user_id, input).await.unwrap_err();
    assert!(matches!(err, Error::Policy(_)), "{name}: {err:?}");
  }

  // Rating from a company the submitter does not own.
  let err = s
    .insert_rating(d.buyer.user_id, rating(d.supplier_co.company_id, d.importer.company_id, 150))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");
}

#[tokio::test]
async fn rating_for_missing_rfq_is_invalid_not_a_policy_refusal() {
  let s = store().await;
  let d = deal(&s).await;
  let mut input = rating(d.supplier_co.company_id, d.importer.company_id, 150);
  input.rfq_id = Some(Uuid::new_v4());
  let err = s.insert_rating(d.supplier.user_id, input).await.unwrap_err();
  assert!(matches!(err, Error::Core(souk_core::Error::InvalidInput(_))), "{err:?}");
  assert!(matches!(souk_core::Error::from(err), souk_core::Error::InvalidInput(_)));
}

#[tokio::test]
async fn owner_cannot_review_own_company() {
  let s = store().await;
  let d = deal(&s).await;
  let review = ValidReview { company_id: d.importer.company_id, rating: 5, comment: None };

  let err = s.insert_review(d.buyer.user_id, review.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");

  let ok = s.insert_review(d.supplier.user_id, review).await.unwrap();
  assert_eq!(s.reviews_for_company(d.importer.company_id).await.unwrap(), vec![ok]);
}

// ─── KYC and catalog ─────────────────────────────────────────────────────────

#[tokio::test]
async fn kyc_upload_requires_ownership() {
  let s = store().await;
  let d = deal(&s).await;
  let input = |path: &str| NewKycDocument {
    company_id:   d.importer.company_id,
    doc_type:     DocType::BusinessRegistration,
    storage_path: path.into(),
  };

  let err = s
    .insert_kyc_document(d.supplier.user_id, input("kyc/x/1-a-rc.pdf"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");

  let doc = s
    .insert_kyc_document(d.buyer.user_id, input("kyc/x/2-b-rc.pdf"))
    .await
    .unwrap();
  assert_eq!(s.get_kyc_document(doc.doc_id).await.unwrap(), Some(doc.clone()));
  assert_eq!(s.kyc_documents(d.importer.company_id).await.unwrap(), vec![doc]);
}

#[tokio::test]
async fn listing_joins_product_and_enforces_owner() {
  let s = store().await;
  let d = deal(&s).await;
  let product = s
    .create_product(
      d.supplier.user_id,
      NewProduct {
        company_id:  d.supplier_co.company_id,
        name:        "Durum wheat".into(),
        category:    Some("grain".into()),
        description: None,
      },
    )
    .await
    .unwrap();

  let input = NewListing {
    product_id: product.product_id,
    moq:        Some(25),
    price_min:  Some(300.0),
    price_max:  Some(340.0),
    incoterm:   Some("CIF".into()),
    status:     ListingStatus::Active,
  };

  let err = s.create_listing(d.buyer.user_id, input.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Policy(_)), "{err:?}");

  let listing = s.create_listing(d.supplier.user_id, input).await.unwrap();
  assert_eq!(listing.product_name, "Durum wheat");
  assert_eq!(listing.company_id, d.supplier_co.company_id);
  assert_eq!(s.list_listings(Some(d.supplier_co.company_id)).await.unwrap().len(), 1);
  assert!(s.list_listings(Some(d.importer.company_id)).await.unwrap().is_empty());
  assert_eq!(s.list_products(None).await.unwrap(), vec![product]);
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_filters_by_role_country_and_name() {
  let s = store().await;
  let d = deal(&s).await;
  let other = user(&s, "other@example.ma").await;
  s.create_company(
    other.user_id,
    NewCompany { name: "Atlas Trading".into(), country: Some("MA".into()), role: CompanyRole::Importer },
  )
  .await
  .unwrap();

  let query = CompanyQuery {
    name:    Some("atlas".into()),
    role:    Some(CompanyRole::Importer),
    country: Some("dz".into()),
    limit:   None,
  };
  let found = s.search_companies(&query).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].company_id, d.importer.company_id);

  let wildcard = CompanyQuery { name: Some("%".into()), ..Default::default() };
  assert!(s.search_companies(&wildcard).await.unwrap().is_empty());
}

#[tokio::test]
async fn name_search_folds_non_ascii_case() {
  let s = store().await;
  let owner = user(&s, "elan@example.fr").await;
  let elan = company(&s, &owner, "Élan Import", CompanyRole::Importer).await;

  for needle in ["Élan", "élan", "ÉLAN IMP"] {
    let query = CompanyQuery { name: Some(needle.into()), ..Default::default() };
    let found = s.search_companies(&query).await.unwrap();
    assert_eq!(found.len(), 1, "{needle}");
    assert_eq!(found[0].company_id, elan.company_id);
    assert_eq!(found[0].name, "Élan Import");
  }
}

#[tokio::test]
async fn supplier_quotes_and_cross_rfq_messages() {
  let s = store().await;
  let d = deal(&s).await;
  let second = s
    .create_rfq(d.buyer.user_id, new_rfq(d.importer.company_id, None))
    .await
    .unwrap()
    .value
    .rfq_id;
  let first = s
    .create_quote(d.supplier.user_id, new_quote(d.rfq_id, d.supplier_co.company_id))
    .await
    .unwrap();
  let latest = s
    .create_quote(d.supplier.user_id, new_quote(second, d.supplier_co.company_id))
    .await
    .unwrap();

  let quotes = s.quotes_by_suppliers(vec![d.supplier_co.company_id]).await.unwrap();
  let ids: Vec<_> = quotes.iter().map(|q| q.quote_id).collect();
  assert_eq!(ids, [latest.value.quote_id, first.value.quote_id]);
  assert!(s.quotes_by_suppliers(vec![d.importer.company_id]).await.unwrap().is_empty());
  assert!(s.quotes_by_suppliers(vec![]).await.unwrap().is_empty());

  s.send_message(d.buyer.user_id, message(d.rfq_id, "one")).await.unwrap();
  s.send_message(d.buyer.user_id, message(second, "two")).await.unwrap();
  s.send_message(d.buyer.user_id, message(d.rfq_id, "three")).await.unwrap();

  let inbox = s.messages_for_rfqs(vec![d.rfq_id, second], 100).await.unwrap();
  let bodies: Vec<_> = inbox.iter().map(|m| m.body.as_str()).collect();
  assert_eq!(bodies, ["three", "two", "one"]);
  let only_second = s.messages_for_rfqs(vec![second], 100).await.unwrap();
  assert_eq!(only_second.len(), 1);
  assert_eq!(s.messages_for_rfqs(vec![d.rfq_id, second], 2).await.unwrap().len(), 2);
  assert!(s.messages_for_rfqs(vec![], 100).await.unwrap().is_empty());
}

// ─── Access model against the store ──────────────────────────────────────────

#[tokio::test]
async fn missing_buyer_roster_row_is_repaired() {
  let s = store().await;
  let d = deal(&s).await;
  s.exec_raw("DELETE FROM rfq_participants").await.unwrap();

  let access = AccessModel::new(&s)
    .check(Some(&d.buyer), d.rfq_id, Operation::SendMessage)
    .await
    .unwrap();
  assert_eq!(access.participation, Some(Participation::Buyer));
  assert_eq!(
    s.participant_role(d.rfq_id, d.buyer.user_id).await.unwrap(),
    Some(ParticipantRole::Buyer)
  );
}

#[tokio::test]
async fn stranger_sees_not_found() {
  let s = store().await;
  let d = deal(&s).await;
  let err = AccessModel::new(&s)
    .check(Some(&d.supplier), d.rfq_id, Operation::View)
    .await
    .unwrap_err();
  assert!(matches!(err, souk_core::Error::NotFound { what: "rfq", .. }));
}

#[tokio::test]
async fn participating_unions_all_sources_once() {
  let s = store().await;
  let d = deal(&s).await;

  // The supplier quotes and is also on the roster: still one option.
  s.create_quote(d.supplier.user_id, new_quote(d.rfq_id, d.supplier_co.company_id))
    .await
    .unwrap();
  s.add_participant(d.rfq_id, d.supplier.user_id, ParticipantRole::Supplier)
    .await
    .unwrap();

  let model = AccessModel::new(&s);
  let actor = model.actor(Some(&d.supplier)).await.unwrap();
  let seen = model.participating(&actor).await.unwrap();
  assert_eq!(seen.options.len(), 1);
  assert_eq!(seen.options[0].id, d.rfq_id);
  assert_eq!(seen.options[0].label, "Durum wheat, 500t");
  assert_eq!(seen.rfqs.len(), 1);

  let access = model
    .check(Some(&d.supplier), d.rfq_id, Operation::ReadMessages)
    .await
    .unwrap();
  assert_eq!(access.participation, Some(Participation::Roster(ParticipantRole::Supplier)));
}
