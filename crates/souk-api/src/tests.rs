//! Router tests: each request goes through [`api_router`] with `oneshot`,
//! backed by an in-memory store and a temporary blob root.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use souk_blob::BlobStore;
use souk_core::{store::MarketStore, user::NewUser};
use souk_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use super::*;

const URL_ORIGIN: &str = "http://souk.test";

async fn make_state() -> ApiState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let root = std::env::temp_dir().join(format!("souk-api-{}", uuid::Uuid::new_v4()));
  let blobs = BlobStore::new(root, &format!("{URL_ORIGIN}/blobs"), b"blob-secret");
  blobs.init().await.unwrap();
  ApiState {
    store:    Arc::new(store),
    blobs:    Arc::new(blobs),
    sessions: Arc::new(SessionKeys::new(b"session-secret", Duration::hours(1))),
    config:   Arc::new(ApiConfig::default()),
  }
}

/// A user created straight in the store, with a token. Skips password
/// hashing so tests stay fast.
async fn login_as(state: &ApiState<SqliteStore>, email: &str) -> String {
  let user = state
    .store
    .create_user(NewUser { email: email.into(), password_hash: "$argon2id$stub".into() })
    .await
    .unwrap();
  state.sessions.issue(&user, Utc::now()).unwrap()
}

async fn send(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  headers: Vec<(&str, &str)>,
  body: Body,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let resp = api_router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

async fn call(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  match body {
    Some(body) => {
      send(
        state,
        method,
        uri,
        token,
        vec![("content-type", "application/json")],
        Body::from(body.to_string()),
      )
      .await
    }
    None => send(state, method, uri, token, vec![], Body::empty()).await,
  }
}

async fn company(state: &ApiState<SqliteStore>, token: &str, name: &str, role: &str) -> String {
  let (status, body) = call(
    state,
    "POST",
    "/companies",
    Some(token),
    Some(json!({ "name": name, "role": role, "country": "dz" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["company_id"].as_str().unwrap().to_owned()
}

async fn rfq(state: &ApiState<SqliteStore>, token: &str, buyer: &str) -> String {
  let (status, body) = call(
    state,
    "POST",
    "/rfqs",
    Some(token),
    Some(json!({ "buyer_company_id": buyer, "title": "Durum wheat, 500t" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["rfq_id"].as_str().unwrap().to_owned()
}

async fn quote(state: &ApiState<SqliteStore>, token: &str, rfq: &str, supplier: &str) -> (StatusCode, Value) {
  call(
    state,
    "POST",
    &format!("/rfqs/{rfq}/quotes"),
    Some(token),
    Some(json!({ "supplier_id": supplier, "price": 310.0 })),
  )
  .await
}

/// Supplier A with C1, importer B with C2, B's RFQ R1.
struct Deal {
  a:   String,
  b:   String,
  c1:  String,
  c2:  String,
  rfq: String,
}

async fn deal(state: &ApiState<SqliteStore>) -> Deal {
  let a = login_as(state, "a@supplier.test").await;
  let b = login_as(state, "b@importer.test").await;
  let c1 = company(state, &a, "Sahara Grains", "supplier").await;
  let c2 = company(state, &b, "Atlas Foods", "importer").await;
  let rfq = rfq(state, &b, &c2).await;
  Deal { a, b, c1, c2, rfq }
}

// ── Auth ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_and_me() {
  let state = make_state().await;
  let creds = json!({ "email": " Nadia@Example.com ", "password": "correct horse" });

  let (status, body) = call(&state, "POST", "/auth/register", None, Some(creds.clone())).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["user"]["email"], "nadia@example.com");

  let (status, body) = call(&state, "POST", "/auth/register", None, Some(creds.clone())).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "CONFLICT");

  let (status, body) = call(&state, "POST", "/auth/login", None, Some(creds)).await;
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().unwrap().to_owned();

  let (status, body) = call(&state, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["email"], "nadia@example.com");
  assert_eq!(body["companies"], json!([]));

  let wrong = json!({ "email": "nadia@example.com", "password": "battery staple" });
  let (status, body) = call(&state, "POST", "/auth/login", None, Some(wrong)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn short_password_is_invalid_input() {
  let state = make_state().await;
  let creds = json!({ "email": "x@example.com", "password": "short" });
  let (status, body) = call(&state, "POST", "/auth/register", None, Some(creds)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn missing_or_expired_token_is_unauthenticated() {
  let state = make_state().await;
  let (status, body) = call(&state, "GET", "/rfqs", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "UNAUTHENTICATED");

  let user = state
    .store
    .create_user(NewUser { email: "old@example.com".into(), password_hash: "x".into() })
    .await
    .unwrap();
  let stale = state.sessions.issue(&user, Utc::now() - Duration::hours(5)).unwrap();
  let (status, _) = call(&state, "GET", "/companies/mine", Some(&stale), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  // Public reads do not need a session.
  let (status, _) = call(&state, "GET", "/importers?q=atlas", None, None).await;
  assert_eq!(status, StatusCode::OK);
}

// ── RFQs and access ───────────────────────────────────────────────────────────

#[tokio::test]
async fn quoting_supplier_and_buyer_can_message_stranger_cannot() {
  let state = make_state().await;
  let d = deal(&state).await;
  let stranger = login_as(&state, "d@elsewhere.test").await;
  let messages = format!("/rfqs/{}/messages", d.rfq);

  // Before quoting, A has no relation to R1.
  let (status, _) = call(&state, "GET", &messages, Some(&d.a), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = quote(&state, &d.a, &d.rfq, &d.c1).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");

  for (token, text) in [(&d.b, "Need delivery by May"), (&d.a, "We can ship in April")] {
    let (status, body) =
      call(&state, "POST", &messages, Some(token), Some(json!({ "body": text }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
  }
  let (status, body) = call(&state, "GET", &messages, Some(&d.a), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);
  assert_eq!(body[0]["body"], "We can ship in April");

  let (status, body) = call(&state, "GET", &messages, Some(&stranger), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "NOT_FOUND");
  let (status, _) =
    call(&state, "POST", &messages, Some(&stranger), Some(json!({ "body": "hi" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rfq_view_reports_participation_and_grants() {
  let state = make_state().await;
  let d = deal(&state).await;
  quote(&state, &d.a, &d.rfq, &d.c1).await;

  let uri = format!("/rfqs/{}", d.rfq);
  let (status, body) = call(&state, "GET", &uri, Some(&d.b), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["participation"]["via"], "buyer");
  assert_eq!(body["grants"]["send_message"], true);

  let (_, body) = call(&state, "GET", &uri, Some(&d.a), None).await;
  assert_eq!(body["participation"]["via"], "quoted");
  assert_eq!(body["title"], "Durum wheat, 500t");
}

#[tokio::test]
async fn rfq_creation_requires_an_owned_buyer_company() {
  let state = make_state().await;
  let d = deal(&state).await;
  let nobody = login_as(&state, "n@nowhere.test").await;
  let body = json!({ "buyer_company_id": d.c2, "title": "Semolina" });

  let (status, resp) = call(&state, "POST", "/rfqs", Some(&nobody), Some(body.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(resp["error"], "NO_COMPANY");

  let (status, resp) = call(&state, "POST", "/rfqs", Some(&d.a), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(resp["error"], "NOT_COMPANY_OWNER");

  let (_, listed) = call(&state, "GET", "/rfqs", Some(&d.b), None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn idempotency_key_replays_the_original_rfq() {
  let state = make_state().await;
  let d = deal(&state).await;
  let body = json!({ "buyer_company_id": d.c2, "title": "Olive oil, 20 pallets" }).to_string();
  let headers = || vec![("content-type", "application/json"), ("idempotency-key", "form-42")];

  let (first, created) =
    send(&state, "POST", "/rfqs", Some(&d.b), headers(), Body::from(body.clone())).await;
  let (second, replayed) =
    send(&state, "POST", "/rfqs", Some(&d.b), headers(), Body::from(body)).await;
  assert_eq!(first, StatusCode::CREATED);
  assert_eq!(second, StatusCode::OK);
  assert_eq!(created["rfq_id"], replayed["rfq_id"]);

  let (_, listed) = call(&state, "GET", "/rfqs", Some(&d.b), None).await;
  assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn options_list_each_rfq_once() {
  let state = make_state().await;
  let d = deal(&state).await;
  // B also owns a supplier company and quotes on their own RFQ.
  let b_supplier = company(&state, &d.b, "Atlas Export", "supplier").await;
  let (status, _) = quote(&state, &d.b, &d.rfq, &b_supplier).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = call(&state, "GET", "/rfqs/options", Some(&d.b), None).await;
  assert_eq!(status, StatusCode::OK);
  let options = body.as_array().unwrap();
  assert_eq!(options.len(), 1);
  assert_eq!(options[0]["id"], d.rfq.as_str());
  assert_eq!(options[0]["label"], "Durum wheat, 500t");
}

#[tokio::test]
async fn inbox_only_holds_messages_from_joined_rfqs() {
  let state = make_state().await;
  let d = deal(&state).await;
  let e = login_as(&state, "e@elsewhere.test").await;
  let c3 = company(&state, &e, "Oran Imports", "importer").await;
  let other_rfq = rfq(&state, &e, &c3).await;

  quote(&state, &d.a, &d.rfq, &d.c1).await;
  for (token, rfq, text) in [
    (&d.b, &d.rfq, "Need delivery by May"),
    (&e, &other_rfq, "Private to Oran"),
    (&d.a, &d.rfq, "We can ship in April"),
  ] {
    let uri = format!("/rfqs/{rfq}/messages");
    let (status, body) = call(&state, "POST", &uri, Some(token), Some(json!({ "body": text }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
  }

  let bodies = |v: &Value| -> Vec<String> {
    v.as_array().unwrap().iter().map(|m| m["body"].as_str().unwrap().to_owned()).collect()
  };
  let (status, inbox) = call(&state, "GET", "/messages", Some(&d.a), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(bodies(&inbox), ["We can ship in April", "Need delivery by May"]);

  let (_, inbox) = call(&state, "GET", "/messages", Some(&e), None).await;
  assert_eq!(bodies(&inbox), ["Private to Oran"]);

  let nobody = login_as(&state, "n@nowhere.test").await;
  let (status, inbox) = call(&state, "GET", "/messages", Some(&nobody), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(inbox, json!([]));

  let (status, _) = call(&state, "GET", "/messages", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Quotes ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn my_quotes_lists_own_companies_newest_first() {
  let state = make_state().await;
  let d = deal(&state).await;
  let second = rfq(&state, &d.b, &d.c2).await;
  let e = login_as(&state, "e@rival.test").await;
  let c3 = company(&state, &e, "Rival Mills", "supplier").await;

  let (_, first_quote) = quote(&state, &d.a, &d.rfq, &d.c1).await;
  quote(&state, &e, &d.rfq, &c3).await;
  let (_, second_quote) = quote(&state, &d.a, &second, &d.c1).await;

  let (status, mine) = call(&state, "GET", "/quotes", Some(&d.a), None).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<&Value> = mine.as_array().unwrap().iter().map(|q| &q["quote_id"]).collect();
  assert_eq!(ids, [&second_quote["quote_id"], &first_quote["quote_id"]]);

  let (_, buyer) = call(&state, "GET", "/quotes", Some(&d.b), None).await;
  assert_eq!(buyer, json!([]));
}

#[tokio::test]
async fn quote_submission_checks_session_before_the_body() {
  let state = make_state().await;
  let d = deal(&state).await;
  let uri = format!("/rfqs/{}/quotes", d.rfq);
  let (status, body) =
    call(&state, "POST", &uri, None, Some(json!({ "supplier_id": d.c1, "price": -5.0 }))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "UNAUTHENTICATED");

  let (status, body) =
    call(&state, "POST", &uri, Some(&d.a), Some(json!({ "supplier_id": d.c1, "price": -5.0 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn suppliers_see_only_their_quotes_and_buyer_decides() {
  let state = make_state().await;
  let d = deal(&state).await;
  let e = login_as(&state, "e@rival.test").await;
  let c3 = company(&state, &e, "Rival Mills", "supplier").await;

  let (_, q1) = quote(&state, &d.a, &d.rfq, &d.c1).await;
  quote(&state, &e, &d.rfq, &c3).await;

  let quotes = format!("/rfqs/{}/quotes", d.rfq);
  let (_, all) = call(&state, "GET", &quotes, Some(&d.b), None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);
  let (_, own) = call(&state, "GET", &quotes, Some(&d.a), None).await;
  assert_eq!(own.as_array().unwrap().len(), 1);
  assert_eq!(own[0]["supplier_id"], d.c1.as_str());

  let patch = format!("/quotes/{}", q1["quote_id"].as_str().unwrap());
  let (status, body) =
    call(&state, "PATCH", &patch, Some(&d.a), Some(json!({ "status": "accepted" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "NOT_COMPANY_OWNER");

  let (status, body) =
    call(&state, "PATCH", &patch, Some(&d.b), Some(json!({ "status": "accepted" }))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn quoting_from_a_foreign_company_is_refused() {
  let state = make_state().await;
  let d = deal(&state).await;
  let (status, body) = quote(&state, &d.b, &d.rfq, &d.c1).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "NOT_COMPANY_OWNER");
}

// ── Ratings and reviews ───────────────────────────────────────────────────────

#[tokio::test]
async fn self_rating_is_rejected_regardless_of_comment() {
  let state = make_state().await;
  let d = deal(&state).await;
  for comment in ["", "too short", &"x".repeat(200)] {
    let body = json!({ "rater_id": d.c1, "target_id": d.c1, "overall": 5, "comment": comment });
    let (status, resp) = call(&state, "POST", "/rating", Some(&d.a), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "SELF_RATING");
  }
}

#[tokio::test]
async fn self_rating_wins_over_mistyped_fields() {
  let state = make_state().await;
  let d = deal(&state).await;
  for body in [
    json!({ "rater_id": d.c1, "target_id": d.c1, "overall": "five" }),
    json!({ "rater_id": d.c1, "target_id": d.c1, "overall": 4.5 }),
    json!({ "rater_id": d.c1, "target_id": d.c1, "overall": 4, "comment": 123 }),
  ] {
    let (status, resp) = call(&state, "POST", "/rating", Some(&d.a), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "SELF_RATING", "{resp}");
  }

  let mistyped = json!({ "rater_id": d.c1, "target_id": d.c2, "overall": "five" });
  let (status, resp) = call(&state, "POST", "/rating", Some(&d.a), Some(mistyped)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn rating_for_an_unknown_rfq_is_not_found() {
  let state = make_state().await;
  let d = deal(&state).await;
  let body = json!({
    "rater_id": d.c1,
    "target_id": d.c2,
    "overall": 4,
    "comment": "y".repeat(150),
    "rfq_id": uuid::Uuid::new_v4(),
  });
  let (status, resp) = call(&state, "POST", "/rating", Some(&d.a), Some(body)).await;
  assert_eq!(status, StatusCode::NOT_FOUND, "{resp}");
  assert_eq!(resp["error"], "NOT_FOUND");
}

#[tokio::test]
async fn valid_rating_shows_in_target_stats() {
  let state = make_state().await;
  let d = deal(&state).await;

  let short = json!({ "rater_id": d.c1, "target_id": d.c2, "overall": 4, "comment": "x".repeat(139) });
  let (status, body) = call(&state, "POST", "/rating", Some(&d.a), Some(short)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "INVALID_INPUT");

  let valid = json!({ "rater_id": d.c1, "target_id": d.c2, "overall": 4, "comment": "y".repeat(150) });
  let (status, body) = call(&state, "POST", "/rating", Some(&d.a), Some(valid)).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");

  let (status, profile) = call(&state, "GET", &format!("/companies/{}", d.c2), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(profile["stats"]["ratings_count"], 1);
  assert_eq!(profile["stats"]["avg_score"], 4.0);
  assert_eq!(profile["name"], "Atlas Foods");
}

#[tokio::test]
async fn rating_checks_session_before_the_body() {
  let state = make_state().await;
  let resp = send(
    &state,
    "POST",
    "/rating",
    None,
    vec![("content-type", "application/json")],
    Body::from("{not json"),
  )
  .await;
  assert_eq!(resp.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reversed_rating_roles_are_a_mismatch() {
  let state = make_state().await;
  let d = deal(&state).await;
  let body = json!({ "rater_id": d.c2, "target_id": d.c1, "overall": 3, "comment": "z".repeat(150) });
  let (status, resp) = call(&state, "POST", "/rating", Some(&d.b), Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["error"], "ROLE_MISMATCH");
}

#[tokio::test]
async fn owners_cannot_review_their_own_company() {
  let state = make_state().await;
  let d = deal(&state).await;
  let uri = format!("/companies/{}/reviews", d.c1);
  let (status, body) = call(&state, "POST", &uri, Some(&d.a), Some(json!({ "rating": 5 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "SELF_RATING");

  let (status, _) =
    call(&state, "POST", &uri, Some(&d.b), Some(json!({ "rating": 4, "comment": "On time" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let (_, reviews) = call(&state, "GET", &uri, None, None).await;
  assert_eq!(reviews[0]["comment"], "On time");
}

// ── Uploads and objects ───────────────────────────────────────────────────────

fn local_path(url: &str) -> &str { url.strip_prefix(URL_ORIGIN).unwrap() }

#[tokio::test]
async fn kyc_upload_then_signed_download() {
  let state = make_state().await;
  let d = deal(&state).await;
  let upload = format!("/companies/{}/kyc?doc_type=business_registration&filename=Registre%20de%20commerce.pdf", d.c1);

  let (status, body) =
    send(&state, "POST", &upload, Some(&d.b), vec![], Body::from("%PDF-1.7")).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "NOT_COMPANY_OWNER");

  let (status, doc) =
    send(&state, "POST", &upload, Some(&d.a), vec![], Body::from("%PDF-1.7")).await;
  assert_eq!(status, StatusCode::CREATED, "{doc}");
  assert_eq!(doc["status"], "pending");
  let path = doc["storage_path"].as_str().unwrap();
  assert!(path.starts_with(&format!("kyc/{}/", d.c1)), "{path}");
  assert!(path.ends_with("-Registre-de-commerce.pdf"), "{path}");

  let (_, docs) = call(&state, "GET", &format!("/companies/{}/kyc", d.c1), Some(&d.a), None).await;
  assert_eq!(docs.as_array().unwrap().len(), 1);

  let url_route = format!("/kyc/{}/url", doc["doc_id"].as_str().unwrap());
  let (status, _) = call(&state, "GET", &url_route, Some(&d.b), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, signed) = call(&state, "GET", &url_route, Some(&d.a), None).await;
  assert_eq!(status, StatusCode::OK);
  let url = signed["url"].as_str().unwrap();

  let req = Request::builder().uri(local_path(url)).body(Body::empty()).unwrap();
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"%PDF-1.7");

  // Without or with a forged signature the object stays private.
  let unsigned = local_path(url).split_once('?').unwrap().0.to_owned();
  let (status, body) = call(&state, "GET", &unsigned, None, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "INVALID_SIGNATURE");
  let forged = format!("{unsigned}?expires=9999999999&sig=00ff");
  let (status, _) = call(&state, "GET", &forged, None, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn evidence_needs_rfq_visibility_and_is_public() {
  let state = make_state().await;
  let d = deal(&state).await;
  let stranger = login_as(&state, "d@elsewhere.test").await;
  let upload = format!("/rfqs/{}/evidence?filename=../../bon%20de%20livraison.png", d.rfq);

  let (status, _) =
    send(&state, "POST", &upload, Some(&stranger), vec![], Body::from("png")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send(&state, "POST", &upload, Some(&d.b), vec![], Body::from("png")).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let key = body["key"].as_str().unwrap();
  assert!(key.starts_with(&format!("proofs/{}/", d.rfq)));
  assert!(!key.contains(".."));

  let req = Request::builder()
    .uri(local_path(body["url"].as_str().unwrap()))
    .body(Body::empty())
    .unwrap();
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
}

// ── Directory and catalog ─────────────────────────────────────────────────────

#[tokio::test]
async fn importer_directory_is_pinned_to_role_and_market() {
  let state = make_state().await;
  let d = deal(&state).await;
  let f = login_as(&state, "f@abroad.test").await;
  call(
    &state,
    "POST",
    "/companies",
    Some(&f),
    Some(json!({ "name": "Atlas Trading", "role": "importer", "country": "MA" })),
  )
  .await;
  company(&state, &d.a, "Atlas Mills", "supplier").await;

  let (status, body) = call(&state, "GET", "/importers?q=atlas", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let found = body.as_array().unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0]["company_id"], d.c2.as_str());
}

#[tokio::test]
async fn listings_require_owning_the_product_company() {
  let state = make_state().await;
  let d = deal(&state).await;
  let (status, product) = call(
    &state,
    "POST",
    "/products",
    Some(&d.a),
    Some(json!({ "company_id": d.c1, "name": "Durum wheat", "category": "grain" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{product}");

  let listing = json!({
    "product_id": product["product_id"],
    "moq": 20,
    "price_min": 290.0,
    "price_max": 320.0,
    "incoterm": "fob",
    "status": "active",
  });
  let (status, body) = call(&state, "POST", "/listings", Some(&d.b), Some(listing.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "NOT_COMPANY_OWNER");

  let (status, body) = call(&state, "POST", "/listings", Some(&d.a), Some(listing)).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["product_name"], "Durum wheat");
  assert_eq!(body["incoterm"], "FOB");

  let (_, listed) =
    call(&state, "GET", &format!("/listings?company_id={}", d.c1), None, None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_bodies_are_invalid_input() {
  let state = make_state().await;
  let d = deal(&state).await;
  let (status, body) =
    call(&state, "POST", "/companies", Some(&d.a), Some(json!({ "name": "X Co", "role": "broker" })))
      .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "INVALID_INPUT");

  let (status, _) = call(&state, "GET", "/companies/not-a-uuid", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
