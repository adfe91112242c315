//! In-memory [`TargetApi`] for tests.
//!
//! Holds activities, audiences and offers as plain JSON, records every write,
//! and can be told to fail individual calls.

use std::{
  collections::{HashMap, HashSet},
  sync::{Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;

use crate::{
  Error, Result,
  activity::{ActivityOverview, ActivityType, Audience, Offer, OfferSummary},
  api::{QueryParams, TargetApi},
};

/// A call [`MemoryTarget`] can be told to fail with a 500.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Failure {
  ListActivities,
  ListAudiences,
  ListOffers,
  ActivityDetail(String),
  OfferDetail(String),
  UpdateActivity(String),
  UpdateOffer(String),
}

#[derive(Default)]
struct State {
  activities:      Vec<ActivityOverview>,
  details:         HashMap<String, Value>,
  audiences:       Vec<Audience>,
  offers:          Vec<OfferSummary>,
  offer_details:   HashMap<String, Offer>,
  failures:        HashSet<Failure>,
  activity_writes: Vec<(String, Value)>,
  offer_writes:    Vec<(String, Value)>,
}

impl State {
  fn check(&self, failure: Failure) -> Result<()> {
    if self.failures.contains(&failure) {
      return Err(Error::status(500, &format!("{failure:?}"), "injected failure"));
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryTarget {
  state: Mutex<State>,
}

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> T {
  serde_json::from_value(value).unwrap_or_else(|e| panic!("invalid fixture: {e}"))
}

impl MemoryTarget {
  pub fn new() -> Self { Self::default() }

  fn state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register an activity: its list overview and its detail payload.
  pub fn add_activity(&self, overview: Value, detail: Value) {
    let overview: ActivityOverview = parse(overview);
    let mut state = self.state();
    if let Some(id) = overview.id_string() {
      state.details.insert(id, detail);
    }
    state.activities.push(overview);
  }

  pub fn add_audience(&self, audience: Value) { self.state().audiences.push(parse(audience)); }

  /// Register an offer: its list summary and its full definition.
  pub fn add_offer(&self, summary: Value, detail: Value) {
    let summary: OfferSummary = parse(summary);
    let mut state = self.state();
    if let Some(id) = summary.id_string() {
      state.offer_details.insert(id, parse(detail));
    }
    state.offers.push(summary);
  }

  pub fn fail(&self, failure: Failure) { self.state().failures.insert(failure); }

  /// `(activity id, body)` of every activity write, in order.
  pub fn activity_writes(&self) -> Vec<(String, Value)> { self.state().activity_writes.clone() }

  /// `(offer id, body)` of every offer write, in order.
  pub fn offer_writes(&self) -> Vec<(String, Value)> { self.state().offer_writes.clone() }

  /// Current stored definition of an offer.
  pub fn offer(&self, id: &str) -> Option<Offer> { self.state().offer_details.get(id).cloned() }

  /// Current stored detail payload of an activity.
  pub fn activity(&self, id: &str) -> Option<Value> { self.state().details.get(id).cloned() }
}

impl TargetApi for MemoryTarget {
  async fn list_activities(&self, _query: &QueryParams) -> Result<Vec<ActivityOverview>> {
    let state = self.state();
    state.check(Failure::ListActivities)?;
    Ok(state.activities.clone())
  }

  async fn activity_detail(&self, _kind: ActivityType, id: &str) -> Result<Value> {
    let state = self.state();
    state.check(Failure::ActivityDetail(id.to_owned()))?;
    state
      .details
      .get(id)
      .cloned()
      .ok_or_else(|| Error::status(404, &format!("GET /activities/{id}"), "not found"))
  }

  async fn update_activity(&self, _kind: ActivityType, id: &str, body: &Value) -> Result<Value> {
    let mut state = self.state();
    state.check(Failure::UpdateActivity(id.to_owned()))?;
    state.activity_writes.push((id.to_owned(), body.clone()));
    state.details.insert(id.to_owned(), body.clone());
    Ok(body.clone())
  }

  async fn list_audiences(&self) -> Result<Vec<Audience>> {
    let state = self.state();
    state.check(Failure::ListAudiences)?;
    Ok(state.audiences.clone())
  }

  async fn list_offers(&self, query: &QueryParams) -> Result<Vec<OfferSummary>> {
    let state = self.state();
    state.check(Failure::ListOffers)?;
    let search = query
      .iter()
      .find(|(k, _)| k == "search")
      .map(|(_, v)| v.as_str());
    Ok(
      state
        .offers
        .iter()
        .filter(|offer| {
          search.is_none_or(|needle| {
            offer.id_string().as_deref() == Some(needle)
              || offer.name.as_deref().is_some_and(|n| n.contains(needle))
          })
        })
        .cloned()
        .collect(),
    )
  }

  async fn offer_detail(&self, _kind: &str, id: &str) -> Result<Offer> {
    let state = self.state();
    state.check(Failure::OfferDetail(id.to_owned()))?;
    state
      .offer_details
      .get(id)
      .cloned()
      .ok_or_else(|| Error::status(404, &format!("GET /offers/{id}"), "not found"))
  }

  async fn update_offer(&self, _kind: &str, id: &str, body: &Value) -> Result<Value> {
    let mut state = self.state();
    state.check(Failure::UpdateOffer(id.to_owned()))?;
    state.offer_writes.push((id.to_owned(), body.clone()));
    if let Some(offer) = state.offer_details.get_mut(id) {
      if let Some(content) = body.get("content") {
        offer.content = content.clone();
      }
      if let Some(name) = body.get("name").and_then(Value::as_str) {
        offer.name = Some(name.to_owned());
      }
    }
    Ok(body.clone())
  }
}
