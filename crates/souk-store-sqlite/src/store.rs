//! [`SqliteStore`]: the SQLite implementation of [`MarketStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, Row, params, params_from_iter, types::Value};
use souk_core::{
  catalog::{Listing, NewListing, NewProduct, Product},
  company::{Company, CompanyQuery, NewCompany},
  kyc::{KycDocument, KycStatus, NewKycDocument},
  message::{Message, MessageQuery, NewMessage},
  quote::{NewQuote, Quote, QuoteStatus},
  rating::{NewRating, Rating, RatingStats, Review, ValidReview},
  rfq::{NewRfq, Participant, ParticipantRole, Rfq},
  store::{Created, MarketStore},
  user::{Credentials, NewUser, User},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawCompany, RawKycDocument, RawListing, RawMessage, RawParticipant, RawProduct, RawQuote,
    RawRating, RawReview, RawRfq, RawUser, decode_enum, decode_uuid, encode_dt, encode_list, encode_uuid,
    like_pattern,
  },
  schema::SCHEMA,
};

const DEFAULT_SEARCH_LIMIT: usize = 50;
const MAX_SEARCH_LIMIT: usize = 200;
const DEFAULT_MESSAGE_LIMIT: usize = 50;
const MAX_MESSAGE_LIMIT: usize = 200;

fn text(s: String) -> Value { Value::Text(s) }

/// `?, ?, …` with `n` placeholders.
fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn uuid_values(ids: &[Uuid]) -> Vec<Value> {
  ids.iter().map(|id| text(encode_uuid(*id))).collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A marketplace store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `sql` with positional `args` and decode every row with `from_row`.
  async fn fetch<R, F>(&self, sql: String, args: Vec<Value>, from_row: F) -> Result<Vec<R>>
  where
    R: Send + 'static,
    F: FnMut(&Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args), from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn fetch_one<R, F>(&self, sql: String, args: Vec<Value>, from_row: F) -> Result<Option<R>>
  where
    R: Send + 'static,
    F: FnMut(&Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    Ok(self.fetch(sql, args, from_row).await?.into_iter().next())
  }

  async fn fetch_ids(&self, sql: String, args: Vec<Value>) -> Result<Vec<Uuid>> {
    let raw: Vec<String> = self.fetch(sql, args, |row| row.get(0)).await?;
    raw.iter().map(|s| decode_uuid(s)).collect()
  }

  /// Run raw SQL, bypassing the `MarketStore` surface.
  #[cfg(test)]
  pub(crate) async fn exec_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Execute a single statement with positional `args`.
  async fn execute(&self, sql: &'static str, args: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, params_from_iter(args))?))
      .await?;
    Ok(changed)
  }
}

// ─── MarketStore impl ────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User { user_id: Uuid::new_v4(), email: input.email, created_at: Utc::now() };

    self
      .execute(
        "INSERT INTO users (user_id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        vec![
          text(encode_uuid(user.user_id)),
          text(user.email.clone()),
          text(input.password_hash),
          text(encode_dt(user.created_at)),
        ],
      )
      .await
      .map_err(|e| match e {
        Error::Conflict(_) => Error::Conflict(format!("email {} is already registered", user.email)),
        other => other,
      })?;

    debug!(user_id = %user.user_id, "user created");
    Ok(user)
  }

  async fn find_credentials<'a>(&'a self, email: &'a str) -> Result<Option<Credentials>> {
    let sql = format!("SELECT {}, password_hash FROM users WHERE email = ?1", RawUser::COLUMNS);
    let row = self
      .fetch_one(sql, vec![text(email.to_owned())], |row| {
        Ok((RawUser::from_row(row)?, row.get::<_, String>(3)?))
      })
      .await?;

    row
      .map(|(raw, password_hash)| Ok(Credentials { user: raw.into_user()?, password_hash }))
      .transpose()
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS);
    let raw = self.fetch_one(sql, vec![text(encode_uuid(id))], RawUser::from_row).await?;
    raw.map(RawUser::into_user).transpose()
  }

  // ── Companies ─────────────────────────────────────────────────────────────

  async fn create_company(&self, owner: Uuid, input: NewCompany) -> Result<Company> {
    let company = Company {
      company_id: Uuid::new_v4(),
      owner,
      name: input.name,
      country: input.country,
      role: input.role,
      score: None,
      kyc_level: 0,
      created_at: Utc::now(),
    };

    self
      .execute(
        "INSERT INTO companies (company_id, owner, name, name_fold, country, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
          text(encode_uuid(company.company_id)),
          text(encode_uuid(owner)),
          text(company.name.clone()),
          text(company.name.to_lowercase()),
          company.country.clone().map_or(Value::Null, text),
          text(company.role.to_string()),
          text(encode_dt(company.created_at)),
        ],
      )
      .await?;

    debug!(company_id = %company.company_id, %owner, "company created");
    Ok(company)
  }

  async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
    let sql = format!("SELECT {} FROM companies WHERE company_id = ?1", RawCompany::COLUMNS);
    let raw = self.fetch_one(sql, vec![text(encode_uuid(id))], RawCompany::from_row).await?;
    raw.map(RawCompany::into_company).transpose()
  }

  async fn companies_owned_by(&self, user: Uuid) -> Result<Vec<Company>> {
    let sql = format!(
      "SELECT {} FROM companies WHERE owner = ?1 ORDER BY created_at, rowid",
      RawCompany::COLUMNS
    );
    let raws = self.fetch(sql, vec![text(encode_uuid(user))], RawCompany::from_row).await?;
    raws.into_iter().map(RawCompany::into_company).collect()
  }

  async fn search_companies<'a>(&'a self, query: &'a CompanyQuery) -> Result<Vec<Company>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut args: Vec<Value> = vec![];

    if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
      conds.push("name_fold LIKE ? ESCAPE '\\'");
      args.push(text(like_pattern(&name.to_lowercase())));
    }
    if let Some(role) = query.role {
      conds.push("role = ?");
      args.push(text(role.to_string()));
    }
    if let Some(country) = &query.country {
      conds.push("country = ?");
      args.push(text(country.trim().to_uppercase()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
    args.push(Value::Integer(limit as i64));

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT {} FROM companies {where_clause} ORDER BY name COLLATE NOCASE, rowid LIMIT ?",
      RawCompany::COLUMNS
    );

    let raws = self.fetch(sql, args, RawCompany::from_row).await?;
    raws.into_iter().map(RawCompany::into_company).collect()
  }

  async fn rating_stats(&self, company: Uuid) -> Result<RatingStats> {
    let row: Option<(Option<f64>, i64)> = self
      .fetch_one(
        "SELECT avg_score, ratings_count FROM company_rating_stats WHERE company_id = ?1".into(),
        vec![text(encode_uuid(company))],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .await?;

    let (avg_score, count) = row.unwrap_or((None, 0));
    Ok(RatingStats { company_id: company, avg_score, ratings_count: count.max(0) as u64 })
  }

  // ── RFQs and roster ───────────────────────────────────────────────────────

  async fn create_rfq(&self, creator: Uuid, input: NewRfq) -> Result<Created<Rfq>> {
    let rfq = Rfq {
      rfq_id:           Uuid::new_v4(),
      buyer_company_id: input.buyer_company_id,
      title:            input.title,
      description:      input.description,
      created_by:       creator,
      created_at:       Utc::now(),
    };

    let id_str = encode_uuid(rfq.rfq_id);
    let buyer_str = encode_uuid(rfq.buyer_company_id);
    let title = rfq.title.clone();
    let description = rfq.description.clone();
    let creator_str = encode_uuid(creator);
    let at_str = encode_dt(rfq.created_at);
    let key = input.idempotency_key;

    let existing: Option<RawRfq> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(key) = &key {
          let found = tx
            .query_row(
              &format!(
                "SELECT {} FROM rfqs WHERE created_by = ?1 AND idempotency_key = ?2",
                RawRfq::COLUMNS
              ),
              params![creator_str, key],
              RawRfq::from_row,
            )
            .optional()?;
          if found.is_some() {
            return Ok(found);
          }
        }
        tx.execute(
          "INSERT INTO rfqs (
             rfq_id, buyer_company_id, title, description, created_by, created_at, idempotency_key
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![id_str, buyer_str, title, description, creator_str, at_str, key],
        )?;
        tx.execute(
          "INSERT OR IGNORE INTO rfq_participants (rfq_id, user_id, role, created_at)
           VALUES (?1, ?2, 'buyer', ?3)",
          params![id_str, creator_str, at_str],
        )?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match existing {
      Some(raw) => Ok(Created::replayed(raw.into_rfq()?)),
      None => {
        debug!(rfq_id = %rfq.rfq_id, %creator, "rfq created");
        Ok(Created::fresh(rfq))
      }
    }
  }

  async fn get_rfq(&self, id: Uuid) -> Result<Option<Rfq>> {
    let sql = format!("SELECT {} FROM rfqs WHERE rfq_id = ?1", RawRfq::COLUMNS);
    let raw = self.fetch_one(sql, vec![text(encode_uuid(id))], RawRfq::from_row).await?;
    raw.map(RawRfq::into_rfq).transpose()
  }

  async fn rfqs_by_buyers(&self, companies: Vec<Uuid>) -> Result<Vec<Rfq>> {
    if companies.is_empty() {
      return Ok(vec![]);
    }
    let sql = format!(
      "SELECT {} FROM rfqs WHERE buyer_company_id IN ({}) ORDER BY created_at DESC, rowid DESC",
      RawRfq::COLUMNS,
      placeholders(companies.len())
    );
    let raws = self.fetch(sql, uuid_values(&companies), RawRfq::from_row).await?;
    raws.into_iter().map(RawRfq::into_rfq).collect()
  }

  async fn rfqs_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Rfq>> {
    if ids.is_empty() {
      return Ok(vec![]);
    }
    let sql = format!(
      "SELECT {} FROM rfqs WHERE rfq_id IN ({}) ORDER BY created_at DESC, rowid DESC",
      RawRfq::COLUMNS,
      placeholders(ids.len())
    );
    let raws = self.fetch(sql, uuid_values(&ids), RawRfq::from_row).await?;
    raws.into_iter().map(RawRfq::into_rfq).collect()
  }

  async fn add_participant(
    &self,
    rfq: Uuid,
    user: Uuid,
    role: ParticipantRole,
  ) -> Result<Participant> {
    let rfq_str = encode_uuid(rfq);
    let user_str = encode_uuid(user);
    let role_str = role.to_string();
    let at_str = encode_dt(Utc::now());

    let raw: RawParticipant = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO rfq_participants (rfq_id, user_id, role, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![rfq_str, user_str, role_str, at_str],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {} FROM rfq_participants WHERE rfq_id = ?1 AND user_id = ?2",
            RawParticipant::COLUMNS
          ),
          params![rfq_str, user_str],
          RawParticipant::from_row,
        )?)
      })
      .await?;

    raw.into_participant()
  }

  async fn participant_role(&self, rfq: Uuid, user: Uuid) -> Result<Option<ParticipantRole>> {
    let role: Option<String> = self
      .fetch_one(
        "SELECT role FROM rfq_participants WHERE rfq_id = ?1 AND user_id = ?2".into(),
        vec![text(encode_uuid(rfq)), text(encode_uuid(user))],
        |row| row.get(0),
      )
      .await?;
    role.map(|r| decode_enum("participant role", &r)).transpose()
  }

  async fn rfqs_joined_by(&self, user: Uuid) -> Result<Vec<Uuid>> {
    self
      .fetch_ids(
        "SELECT rfq_id FROM rfq_participants WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
          .into(),
        vec![text(encode_uuid(user))],
      )
      .await
  }

  // ── Quotes ────────────────────────────────────────────────────────────────

  async fn create_quote(&self, submitter: Uuid, input: NewQuote) -> Result<Created<Quote>> {
    let quote = Quote {
      quote_id:     Uuid::new_v4(),
      rfq_id:       input.rfq_id,
      supplier_id:  input.supplier_id,
      price:        input.price,
      message:      input.message,
      status:       QuoteStatus::Sent,
      submitted_by: submitter,
      created_at:   Utc::now(),
    };

    let id_str = encode_uuid(quote.quote_id);
    let rfq_str = encode_uuid(quote.rfq_id);
    let supplier_str = encode_uuid(quote.supplier_id);
    let price = quote.price;
    let message = quote.message.clone();
    let status_str = quote.status.to_string();
    let submitter_str = encode_uuid(submitter);
    let at_str = encode_dt(quote.created_at);
    let key = input.idempotency_key;

    let existing: Option<RawQuote> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(key) = &key {
          let found = tx
            .query_row(
              &format!(
                "SELECT {} FROM quotes WHERE submitted_by = ?1 AND idempotency_key = ?2",
                RawQuote::COLUMNS
              ),
              params![submitter_str, key],
              RawQuote::from_row,
            )
            .optional()?;
          if found.is_some() {
            return Ok(found);
          }
        }
        tx.execute(
          "INSERT INTO quotes (
             quote_id, rfq_id, supplier_id, price, message, status,
             submitted_by, created_at, idempotency_key
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            id_str,
            rfq_str,
            supplier_str,
            price,
            message,
            status_str,
            submitter_str,
            at_str,
            key,
          ],
        )?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match existing {
      Some(raw) => Ok(Created::replayed(raw.into_quote()?)),
      None => {
        debug!(quote_id = %quote.quote_id, rfq_id = %quote.rfq_id, "quote created");
        Ok(Created::fresh(quote))
      }
    }
  }

  async fn get_quote(&self, id: Uuid) -> Result<Option<Quote>> {
    let sql = format!("SELECT {} FROM quotes WHERE quote_id = ?1", RawQuote::COLUMNS);
    let raw = self.fetch_one(sql, vec![text(encode_uuid(id))], RawQuote::from_row).await?;
    raw.map(RawQuote::into_quote).transpose()
  }

  async fn quotes_for_rfq(&self, rfq: Uuid) -> Result<Vec<Quote>> {
    let sql = format!(
      "SELECT {} FROM quotes WHERE rfq_id = ?1 ORDER BY created_at DESC, rowid DESC",
      RawQuote::COLUMNS
    );
    let raws = self.fetch(sql, vec![text(encode_uuid(rfq))], RawQuote::from_row).await?;
    raws.into_iter().map(RawQuote::into_quote).collect()
  }

  async fn quotes_by_suppliers(&self, companies: Vec<Uuid>) -> Result<Vec<Quote>> {
    if companies.is_empty() {
      return Ok(vec![]);
    }
    let sql = format!(
      "SELECT {} FROM quotes WHERE supplier_id IN ({})
       ORDER BY created_at DESC, rowid DESC",
      RawQuote::COLUMNS,
      placeholders(companies.len())
    );
    let raws = self.fetch(sql, uuid_values(&companies), RawQuote::from_row).await?;
    raws.into_iter().map(RawQuote::into_quote).collect()
  }

  async fn quoting_suppliers(&self, rfq: Uuid) -> Result<Vec<Uuid>> {
    self
      .fetch_ids(
        "SELECT DISTINCT supplier_id FROM quotes WHERE rfq_id = ?1".into(),
        vec![text(encode_uuid(rfq))],
      )
      .await
  }

  async fn rfqs_quoted_by(&self, companies: Vec<Uuid>) -> Result<Vec<Uuid>> {
    if companies.is_empty() {
      return Ok(vec![]);
    }
    let sql = format!(
      "SELECT rfq_id FROM quotes WHERE supplier_id IN ({})
       GROUP BY rfq_id ORDER BY MAX(created_at) DESC",
      placeholders(companies.len())
    );
    self.fetch_ids(sql, uuid_values(&companies)).await
  }

  async fn set_quote_status(&self, quote: Uuid, actor: Uuid, status: QuoteStatus) -> Result<Quote> {
    let quote_str = encode_uuid(quote);
    let actor_str = encode_uuid(actor);
    let status_str = status.to_string();

    let raw: Option<RawQuote> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE quotes SET status = ?1, status_changed_by = ?2 WHERE quote_id = ?3",
          params![status_str, actor_str, quote_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          &format!("SELECT {} FROM quotes WHERE quote_id = ?1", RawQuote::COLUMNS),
          params![quote_str],
          RawQuote::from_row,
        )?))
      })
      .await?;

    let quote = raw
      .ok_or_else(|| souk_core::Error::not_found("quote", quote))?
      .into_quote()?;
    debug!(quote_id = %quote.quote_id, %status, "quote status changed");
    Ok(quote)
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn send_message(&self, sender: Uuid, input: NewMessage) -> Result<Created<Message>> {
    let message = Message {
      message_id: Uuid::new_v4(),
      rfq_id: input.rfq_id,
      sender,
      body: input.body,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(message.message_id);
    let rfq_str = encode_uuid(message.rfq_id);
    let sender_str = encode_uuid(sender);
    let body = message.body.clone();
    let at_str = encode_dt(message.created_at);
    let key = input.idempotency_key;

    let existing: Option<RawMessage> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(key) = &key {
          let found = tx
            .query_row(
              &format!(
                "SELECT {} FROM messages WHERE sender = ?1 AND idempotency_key = ?2",
                RawMessage::COLUMNS
              ),
              params![sender_str, key],
              RawMessage::from_row,
            )
            .optional()?;
          if found.is_some() {
            return Ok(found);
          }
        }
        tx.execute(
          "INSERT INTO messages (message_id, rfq_id, sender, body, created_at, idempotency_key)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, rfq_str, sender_str, body, at_str, key],
        )?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match existing {
      Some(raw) => Ok(Created::replayed(raw.into_message()?)),
      None => Ok(Created::fresh(message)),
    }
  }

  async fn messages_for_rfq(&self, rfq: Uuid, query: MessageQuery) -> Result<Vec<Message>> {
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_MESSAGE_LIMIT);
    let mut args = vec![text(encode_uuid(rfq))];
    let before_clause = match query.before {
      Some(before) => {
        args.push(text(encode_dt(before)));
        "AND created_at < ?"
      }
      None => "",
    };
    args.push(Value::Integer(limit as i64));

    let sql = format!(
      "SELECT {} FROM messages WHERE rfq_id = ? {before_clause}
       ORDER BY created_at DESC, rowid DESC LIMIT ?",
      RawMessage::COLUMNS
    );
    let raws = self.fetch(sql, args, RawMessage::from_row).await?;
    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn messages_for_rfqs(&self, rfqs: Vec<Uuid>, limit: usize) -> Result<Vec<Message>> {
    if rfqs.is_empty() {
      return Ok(vec![]);
    }
    let mut args = uuid_values(&rfqs);
    args.push(Value::Integer(limit.clamp(1, MAX_MESSAGE_LIMIT) as i64));
    let sql = format!(
      "SELECT {} FROM messages WHERE rfq_id IN ({})
       ORDER BY created_at DESC, rowid DESC LIMIT ?",
      RawMessage::COLUMNS,
      placeholders(rfqs.len())
    );
    let raws = self.fetch(sql, args, RawMessage::from_row).await?;
    raws.into_iter().map(RawMessage::into_message).collect()
  }

  // ── Ratings and reviews ───────────────────────────────────────────────────

  async fn insert_rating(&self, submitter: Uuid, input: NewRating) -> Result<Rating> {
    let rating = Rating {
      rating_id:         Uuid::new_v4(),
      rater_id:          input.rater_id,
      target_id:         input.target_id,
      overall:           input.overall,
      quality:           input.quality,
      timeliness:        input.timeliness,
      compliance:        input.compliance,
      communication:     input.communication,
      importer_disputes: input.importer_disputes,
      supplier_issues:   input.supplier_issues,
      evidence_urls:     input.evidence_urls,
      comment:           input.comment,
      rfq_id:            input.rfq_id,
      submitted_by:      submitter,
      created_at:        Utc::now(),
    };

    let score = |s: Option<u8>| s.map_or(Value::Null, |s| Value::Integer(s.into()));
    self
      .execute(
        "INSERT INTO ratings (
           rating_id, rater_id, target_id, overall, quality, timeliness, compliance,
           communication, importer_disputes, supplier_issues, evidence_urls, comment,
           rfq_id, submitted_by, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        vec![
          text(encode_uuid(rating.rating_id)),
          text(encode_uuid(rating.rater_id)),
          text(encode_uuid(rating.target_id)),
          Value::Integer(rating.overall.into()),
          score(rating.quality),
          score(rating.timeliness),
          score(rating.compliance),
          score(rating.communication),
          text(encode_list(&rating.importer_disputes)?),
          text(encode_list(&rating.supplier_issues)?),
          text(encode_list(&rating.evidence_urls)?),
          text(rating.comment.clone()),
          rating.rfq_id.map_or(Value::Null, |id| text(encode_uuid(id))),
          text(encode_uuid(submitter)),
          text(encode_dt(rating.created_at)),
        ],
      )
      .await?;

    debug!(rating_id = %rating.rating_id, target_id = %rating.target_id, "rating recorded");
    Ok(rating)
  }

  async fn ratings_for_company(&self, company: Uuid) -> Result<Vec<Rating>> {
    let sql = format!(
      "SELECT {} FROM ratings WHERE target_id = ?1 ORDER BY created_at DESC, rowid DESC",
      RawRating::COLUMNS
    );
    let raws = self.fetch(sql, vec![text(encode_uuid(company))], RawRating::from_row).await?;
    raws.into_iter().map(RawRating::into_rating).collect()
  }

  async fn insert_review(&self, author: Uuid, input: ValidReview) -> Result<Review> {
    let review = Review {
      review_id: Uuid::new_v4(),
      company_id: input.company_id,
      author,
      rating: input.rating,
      comment: input.comment,
      created_at: Utc::now(),
    };

    self
      .execute(
        "INSERT INTO reviews (review_id, company_id, author, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        vec![
          text(encode_uuid(review.review_id)),
          text(encode_uuid(review.company_id)),
          text(encode_uuid(author)),
          Value::Integer(review.rating.into()),
          review.comment.clone().map_or(Value::Null, text),
          text(encode_dt(review.created_at)),
        ],
      )
      .await?;

    Ok(review)
  }

  async fn reviews_for_company(&self, company: Uuid) -> Result<Vec<Review>> {
    let sql = format!(
      "SELECT {} FROM reviews WHERE company_id = ?1 ORDER BY created_at DESC, rowid DESC",
      RawReview::COLUMNS
    );
    let raws = self.fetch(sql, vec![text(encode_uuid(company))], RawReview::from_row).await?;
    raws.into_iter().map(RawReview::into_review).collect()
  }

  // ── KYC ───────────────────────────────────────────────────────────────────

  async fn insert_kyc_document(
    &self,
    uploader: Uuid,
    input: NewKycDocument,
  ) -> Result<KycDocument> {
    let now = Utc::now();
    let doc = KycDocument {
      doc_id:       Uuid::new_v4(),
      company_id:   input.company_id,
      doc_type:     input.doc_type,
      storage_path: input.storage_path,
      status:       KycStatus::Pending,
      uploaded_by:  uploader,
      created_at:   now,
      updated_at:   now,
    };

    self
      .execute(
        "INSERT INTO kyc_documents (
           doc_id, company_id, doc_type, storage_path, status, uploaded_by, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        vec![
          text(encode_uuid(doc.doc_id)),
          text(encode_uuid(doc.company_id)),
          text(doc.doc_type.to_string()),
          text(doc.storage_path.clone()),
          text(doc.status.to_string()),
          text(encode_uuid(uploader)),
          text(encode_dt(now)),
        ],
      )
      .await?;

    debug!(doc_id = %doc.doc_id, company_id = %doc.company_id, "kyc document recorded");
    Ok(doc)
  }

  async fn get_kyc_document(&self, id: Uuid) -> Result<Option<KycDocument>> {
    let sql = format!("SELECT {} FROM kyc_documents WHERE doc_id = ?1", RawKycDocument::COLUMNS);
    let raw = self.fetch_one(sql, vec![text(encode_uuid(id))], RawKycDocument::from_row).await?;
    raw.map(RawKycDocument::into_document).transpose()
  }

  async fn kyc_documents(&self, company: Uuid) -> Result<Vec<KycDocument>> {
    let sql = format!(
      "SELECT {} FROM kyc_documents WHERE company_id = ?1 ORDER BY created_at DESC, rowid DESC",
      RawKycDocument::COLUMNS
    );
    let raws = self
      .fetch(sql, vec![text(encode_uuid(company))], RawKycDocument::from_row)
      .await?;
    raws.into_iter().map(RawKycDocument::into_document).collect()
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn create_product(&self, creator: Uuid, input: NewProduct) -> Result<Product> {
    let product = Product {
      product_id:  Uuid::new_v4(),
      company_id:  input.company_id,
      name:        input.name,
      category:    input.category,
      description: input.description,
      created_by:  creator,
      created_at:  Utc::now(),
    };

    self
      .execute(
        "INSERT INTO products (
           product_id, company_id, name, category, description, created_by, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
          text(encode_uuid(product.product_id)),
          text(encode_uuid(product.company_id)),
          text(product.name.clone()),
          product.category.clone().map_or(Value::Null, text),
          product.description.clone().map_or(Value::Null, text),
          text(encode_uuid(creator)),
          text(encode_dt(product.created_at)),
        ],
      )
      .await?;

    Ok(product)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE product_id = ?1", RawProduct::COLUMNS);
    let raw = self.fetch_one(sql, vec![text(encode_uuid(id))], RawProduct::from_row).await?;
    raw.map(RawProduct::into_product).transpose()
  }

  async fn list_products(&self, company: Option<Uuid>) -> Result<Vec<Product>> {
    let (filter, args) = match company {
      Some(id) => ("WHERE company_id = ?1", vec![text(encode_uuid(id))]),
      None => ("", vec![]),
    };
    let sql = format!(
      "SELECT {} FROM products {filter} ORDER BY created_at DESC, rowid DESC",
      RawProduct::COLUMNS
    );
    let raws = self.fetch(sql, args, RawProduct::from_row).await?;
    raws.into_iter().map(RawProduct::into_product).collect()
  }

  async fn create_listing(&self, creator: Uuid, input: NewListing) -> Result<Listing> {
    let listing_id = Uuid::new_v4();
    let price = |p: Option<f64>| p.map_or(Value::Null, Value::Real);

    self
      .execute(
        "INSERT INTO listings (
           listing_id, product_id, moq, price_min, price_max, incoterm, status,
           created_by, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        vec![
          text(encode_uuid(listing_id)),
          text(encode_uuid(input.product_id)),
          input.moq.map_or(Value::Null, Value::Integer),
          price(input.price_min),
          price(input.price_max),
          input.incoterm.map_or(Value::Null, text),
          text(input.status.to_string()),
          text(encode_uuid(creator)),
          text(encode_dt(Utc::now())),
        ],
      )
      .await?;

    // Re-read to pick up the product join.
    let sql = format!(
      "SELECT {} FROM listings l JOIN products p ON p.product_id = l.product_id
       WHERE l.listing_id = ?1",
      RawListing::COLUMNS
    );
    let raw = self
      .fetch_one(sql, vec![text(encode_uuid(listing_id))], RawListing::from_row)
      .await?
      .ok_or_else(|| souk_core::Error::not_found("listing", listing_id))?;
    raw.into_listing()
  }

  async fn list_listings(&self, company: Option<Uuid>) -> Result<Vec<Listing>> {
    let (filter, args) = match company {
      Some(id) => ("WHERE p.company_id = ?1", vec![text(encode_uuid(id))]),
      None => ("", vec![]),
    };
    let sql = format!(
      "SELECT {} FROM listings l JOIN products p ON p.product_id = l.product_id
       {filter} ORDER BY l.created_at DESC, l.rowid DESC",
      RawListing::COLUMNS
    );
    let raws = self.fetch(sql, args, RawListing::from_row).await?;
    raws.into_iter().map(RawListing::into_listing).collect()
  }
}
