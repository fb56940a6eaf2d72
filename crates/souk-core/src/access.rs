//! Who may see an RFQ, read its thread, post to it, or quote on it.
//!
//! The decision functions here are pure: they take what the store knows about
//! an actor and an RFQ, and answer. [`AccessModel`] gathers those facts from a
//! [`MarketStore`] and applies the decisions.
//!
//! The store enforces the same rules on its own; a caller that skips this
//! module still cannot write what the store refuses.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  company::Company,
  rfq::{ParticipantRole, Rfq, RfqOption, RfqRef, merge_rfq_options},
  store::MarketStore,
  store_err,
  user::Session,
};

/// How a user is connected to an RFQ. Earlier variants take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "via", content = "role")]
pub enum Participation {
  /// The user owns the RFQ's buyer company.
  Buyer,
  /// The user has an explicit roster row.
  Roster(ParticipantRole),
  /// The user owns a company that has a quote (of any status) on the RFQ.
  Quoted,
}

impl Participation {
  pub fn is_buyer_side(self) -> bool {
    matches!(self, Self::Buyer | Self::Roster(ParticipantRole::Buyer))
  }
}

/// The authenticated user together with the companies they own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id:          Uuid,
  pub owned_companies:  BTreeSet<Uuid>,
}

impl Actor {
  pub fn new(user_id: Uuid, companies: &[Company]) -> Self {
    Self { user_id, owned_companies: companies.iter().map(|c| c.company_id).collect() }
  }

  pub fn owns(&self, company: Uuid) -> bool { self.owned_companies.contains(&company) }
}

/// What the store knows about one RFQ, as seen by one actor.
#[derive(Debug, Clone)]
pub struct RfqRelations {
  pub rfq:                Rfq,
  /// The actor's roster row, if any.
  pub roster_role:        Option<ParticipantRole>,
  /// Supplier companies with at least one quote on the RFQ.
  pub quoting_companies:  BTreeSet<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  View,
  ReadMessages,
  SendMessage,
  /// Quote on the RFQ on behalf of `supplier_id`.
  SubmitQuote { supplier_id: Uuid },
}

/// The operations an actor may perform on an RFQ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RfqGrants {
  pub view:          bool,
  pub read_messages: bool,
  pub send_message:  bool,
  pub submit_quote:  bool,
}

/// Resolve how `actor` participates in the RFQ, if at all.
pub fn participation(actor: &Actor, rel: &RfqRelations) -> Option<Participation> {
  if actor.owns(rel.rfq.buyer_company_id) {
    return Some(Participation::Buyer);
  }
  if let Some(role) = rel.roster_role {
    return Some(Participation::Roster(role));
  }
  if rel.quoting_companies.iter().any(|c| actor.owns(*c)) {
    return Some(Participation::Quoted);
  }
  None
}

pub fn grants(actor: Option<&Actor>, rel: &RfqRelations) -> RfqGrants {
  let Some(actor) = actor else {
    return RfqGrants::default();
  };
  let participant = participation(actor, rel).is_some();
  RfqGrants {
    view:          participant,
    read_messages: participant,
    send_message:  participant,
    submit_quote:  !actor.owned_companies.is_empty(),
  }
}

/// Decide a single operation.
///
/// A non-participant gets `NotFound` rather than a denial so the RFQ's
/// existence is not disclosed.
pub fn authorize(
  actor: Option<&Actor>,
  rel: &RfqRelations,
  op: Operation,
) -> Result<Option<Participation>> {
  let actor = actor.ok_or(Error::Unauthenticated)?;
  let found = participation(actor, rel);
  match op {
    Operation::View | Operation::ReadMessages | Operation::SendMessage => found
      .map(Some)
      .ok_or_else(|| Error::not_found("rfq", rel.rfq.rfq_id)),
    Operation::SubmitQuote { supplier_id } => {
      authorize_for_company(actor, supplier_id)?;
      Ok(found)
    }
  }
}

/// Require that `actor` owns some company and, in particular, `company_id`.
pub fn authorize_for_company(actor: &Actor, company_id: Uuid) -> Result<()> {
  if actor.owned_companies.is_empty() {
    return Err(Error::NoCompany);
  }
  if !actor.owns(company_id) {
    return Err(Error::NotOwner(company_id));
  }
  Ok(())
}

// ─── Store-backed checks ─────────────────────────────────────────────────────

/// The result of a successful [`AccessModel::check`].
#[derive(Debug, Clone)]
pub struct RfqAccess {
  pub actor:         Actor,
  pub rfq:           Rfq,
  pub participation: Option<Participation>,
  pub grants:        RfqGrants,
}

/// Every RFQ an actor participates in, in option order.
#[derive(Debug, Clone, Default)]
pub struct Participating {
  pub options: Vec<RfqOption>,
  pub rfqs:    Vec<Rfq>,
}

/// Applies the access decisions against a store.
pub struct AccessModel<'s, S> {
  store: &'s S,
}

impl<'s, S: MarketStore> AccessModel<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Resolve the actor for a session, or fail with `Unauthenticated`.
  pub async fn actor(&self, session: Option<&Session>) -> Result<Actor> {
    let session = session.ok_or(Error::Unauthenticated)?;
    let companies = self
      .store
      .companies_owned_by(session.user_id)
      .await
      .map_err(store_err)?;
    Ok(Actor::new(session.user_id, &companies))
  }

  pub async fn relations(&self, actor: &Actor, rfq_id: Uuid) -> Result<RfqRelations> {
    let rfq = self
      .store
      .get_rfq(rfq_id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found("rfq", rfq_id))?;
    let roster_role = self
      .store
      .participant_role(rfq_id, actor.user_id)
      .await
      .map_err(store_err)?;
    let quoting_companies = self
      .store
      .quoting_suppliers(rfq_id)
      .await
      .map_err(store_err)?
      .into_iter()
      .collect();
    Ok(RfqRelations { rfq, roster_role, quoting_companies })
  }

  /// Authorize `op` on `rfq_id` for the session's user.
  ///
  /// A buyer-company owner without a roster row gets one inserted. Failure
  /// to insert is logged and does not affect the decision.
  pub async fn check(
    &self,
    session: Option<&Session>,
    rfq_id: Uuid,
    op: Operation,
  ) -> Result<RfqAccess> {
    let actor = self.actor(session).await?;
    let rel = self.relations(&actor, rfq_id).await?;
    let participation = authorize(Some(&actor), &rel, op)?;
    debug!(%rfq_id, user = %actor.user_id, ?op, ?participation, "rfq access granted");

    if participation == Some(Participation::Buyer) && rel.roster_role.is_none() {
      if let Err(e) = self
        .store
        .add_participant(rfq_id, actor.user_id, ParticipantRole::Buyer)
        .await
      {
        warn!(%rfq_id, user = %actor.user_id, error = %e, "failed to repair buyer roster row");
      }
    }

    let grants = grants(Some(&actor), &rel);
    Ok(RfqAccess { actor, rfq: rel.rfq, participation, grants })
  }

  /// RFQs the actor may open, from the buyer, quote and roster sources in
  /// that order.
  pub async fn participating(&self, actor: &Actor) -> Result<Participating> {
    let owned: Vec<Uuid> = actor.owned_companies.iter().copied().collect();

    let as_buyer = if owned.is_empty() {
      Vec::new()
    } else {
      self.store.rfqs_by_buyers(owned.clone()).await.map_err(store_err)?
    };
    let quoted = if owned.is_empty() {
      Vec::new()
    } else {
      self.store.rfqs_quoted_by(owned).await.map_err(store_err)?
    };
    let joined = self
      .store
      .rfqs_joined_by(actor.user_id)
      .await
      .map_err(store_err)?;

    let mut rows: HashMap<Uuid, Rfq> =
      as_buyer.iter().map(|r| (r.rfq_id, r.clone())).collect();
    let missing: Vec<Uuid> = quoted
      .iter()
      .chain(joined.iter())
      .filter(|id| !rows.contains_key(id))
      .copied()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    if !missing.is_empty() {
      for rfq in self.store.rfqs_by_ids(missing).await.map_err(store_err)? {
        rows.insert(rfq.rfq_id, rfq);
      }
    }

    let refs_for = |ids: &[Uuid]| -> Vec<RfqRef> {
      ids
        .iter()
        .map(|id| RfqRef { rfq_id: *id, title: rows.get(id).map(|r| r.title.clone()) })
        .collect()
    };
    let sources = vec![
      as_buyer.iter().map(RfqRef::from).collect(),
      refs_for(&quoted),
      refs_for(&joined),
    ];
    let options = merge_rfq_options(sources);
    let rfqs = options.iter().filter_map(|o| rows.remove(&o.id)).collect();
    Ok(Participating { options, rfqs })
  }
}
