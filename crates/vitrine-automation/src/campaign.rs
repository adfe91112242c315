//! Campaign selection and the shared upstream snapshot.
//!
//! Both automation flows start the same way: fetch activities, audiences and
//! offers concurrently, keep the approved activities of the campaign, and drop
//! those with an end date (the campaign's offers are evergreen).

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde_json::Value;
use vitrine_core::{
  Result,
  activity::{ActivityOverview, Audience, OfferSummary},
  api::TargetApi,
  assemble::EnrichedOption,
  scan,
};

pub const DEFAULT_CAMPAIGN_MARKER: &str = "Trava Telas";

// ─── Campaign ────────────────────────────────────────────────────────────────

/// Identifies the campaign's activities by a name substring.
#[derive(Debug, Clone)]
pub struct Campaign {
  marker: String,
}

impl Default for Campaign {
  fn default() -> Self { Self::new(DEFAULT_CAMPAIGN_MARKER) }
}

impl Campaign {
  pub fn new(marker: impl Into<String>) -> Self {
    Self {
      marker: marker.into(),
    }
  }

  pub fn marker(&self) -> &str { &self.marker }

  /// Name contains the marker (case-insensitively) and the activity is
  /// approved.
  pub fn matches(&self, activity: &ActivityOverview) -> bool {
    let marker = self.marker.trim().to_lowercase();
    let named = activity
      .name
      .as_deref()
      .is_some_and(|name| name.to_lowercase().contains(&marker));
    named && activity.normalized_state() == "approved"
  }
}

/// Activities to process.
///
/// With `target`, only the activity with that id, bypassing the name, state
/// and lifetime filters. Otherwise every activity the campaign matches that
/// has no list-level `lifetime.end`.
pub fn select_candidates<'a>(
  activities: &'a [ActivityOverview],
  campaign: &Campaign,
  target: Option<&str>,
) -> Vec<&'a ActivityOverview> {
  match target.map(str::trim) {
    Some(id) => activities
      .iter()
      .filter(|a| a.id_string().as_deref() == Some(id))
      .collect(),
    None => activities
      .iter()
      .filter(|a| campaign.matches(a) && !a.has_lifetime_end())
      .collect(),
  }
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// The instant used for scheduling and the local date used for suffixes.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
  pub now:   DateTime<Utc>,
  pub today: NaiveDate,
}

impl Clock {
  pub fn system() -> Self {
    let local = Local::now();
    Self {
      now:   local.with_timezone(&Utc),
      today: local.date_naive(),
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Offer summaries keyed by normalised id.
#[derive(Debug, Clone, Default)]
pub struct OfferIndex(HashMap<String, OfferSummary>);

impl OfferIndex {
  pub fn new(offers: Vec<OfferSummary>) -> Self {
    Self(
      offers
        .into_iter()
        .filter_map(|o| o.id_string().map(|id| (id, o)))
        .collect(),
    )
  }

  pub fn get(&self, id: &str) -> Option<&OfferSummary> { self.0.get(id) }

  /// The listed type of an offer, lower-cased.
  pub fn kind(&self, id: &str) -> Option<String> { self.get(id)?.normalized_kind() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Everything fetched up front for one automation run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub activities: Vec<ActivityOverview>,
  pub audiences:  Vec<Audience>,
  pub offers:     OfferIndex,
}

/// Fetch activities, audiences and offers concurrently.
///
/// Only the activity list is essential; audiences and offers degrade to empty
/// collections when their fetch fails.
pub async fn fetch_snapshot<A: TargetApi>(api: &A) -> Result<Snapshot> {
  let (activities, audiences, offers) =
    tokio::join!(api.list_activities(&[]), fetch_audiences(api), fetch_offers(api));
  Ok(Snapshot {
    activities: activities?,
    audiences,
    offers: OfferIndex::new(offers),
  })
}

/// The audience collection, or an empty one if it cannot be fetched.
pub async fn fetch_audiences<A: TargetApi>(api: &A) -> Vec<Audience> {
  api.list_audiences().await.unwrap_or_else(|e| {
    tracing::warn!(error = %e, "audience list unavailable, continuing without audiences");
    Vec::new()
  })
}

/// The offer collection, or an empty one if it cannot be fetched.
pub async fn fetch_offers<A: TargetApi>(api: &A) -> Vec<OfferSummary> {
  api.list_offers(&[]).await.unwrap_or_else(|e| {
    tracing::warn!(error = %e, "offer list unavailable, continuing without offers");
    Vec::new()
  })
}

// ─── Option → offer ──────────────────────────────────────────────────────────

/// Where an enriched option's offer content lives.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferSource<'a> {
  /// Content embedded directly in the option.
  Embedded(&'a Value),
  /// A separate offer, fetched by id. `kind` is its listed type, if known.
  Remote { id: String, kind: Option<String> },
  Missing,
}

/// Resolve the offer behind `option`: embedded content first, then
/// `offerId`, then the first offer reference found inside the option.
pub fn offer_source<'a>(
  option: &'a EnrichedOption,
  activity_id: &str,
  offers: &OfferIndex,
) -> OfferSource<'a> {
  if let Some(content) = option.content() {
    return OfferSource::Embedded(content);
  }

  let id = option.offer_id().or_else(|| {
    let node = Value::Object(option.fields.clone());
    scan::scan_best(&node, activity_id).map(|reference| reference.id)
  });

  match id {
    Some(id) => {
      let kind = offers.kind(&id);
      OfferSource::Remote { id, kind }
    }
    None => OfferSource::Missing,
  }
}
