//! Bulk date-suffix renaming across the campaign's activities.
//!
//! Activities are processed concurrently and independently: a failure inside
//! one activity (detail fetch, offer fetch, any write) zeroes that activity's
//! contribution and is reported in the summary, while the others carry on.
//!
//! A remote offer is fetched, counted and written at most once per run. The
//! first activity to reach it claims it; other activities serving the same
//! offer leave it alone.

use std::{collections::HashSet, sync::Mutex};

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use serde::Serialize;
use serde_json::Value;
use vitrine_core::{
  Error, Result,
  activity::{ActivityOverview, Offer, detail_has_lifetime_end, normalize_id},
  api::TargetApi,
  assemble::assemble,
  rename::{date_suffix, rename},
};

use crate::campaign::{
  Campaign, Clock, OfferSource, Snapshot, fetch_snapshot, offer_source,
  select_candidates,
};

/// Computed fields the activity endpoint rejects on write.
const VOLATILE_ACTIVITY_FIELDS: [&str; 3] = ["stateComputed", "revisions", "workspace"];
/// Computed fields dropped from an offer before it is written back.
const VOLATILE_OFFER_FIELDS: [&str; 1] = ["modifiedAt"];

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
  Updated,
  Unchanged,
  Skipped { reason: String },
  Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOutcome {
  pub activity_id: String,
  pub name:        Option<String>,
  pub examined:    usize,
  pub updated:     usize,
  #[serde(flatten)]
  pub status:      OutcomeStatus,
}

impl ActivityOutcome {
  fn new(overview: &ActivityOverview, status: OutcomeStatus) -> Self {
    Self {
      activity_id: overview.id_string().unwrap_or_default(),
      name: overview.name.clone(),
      examined: 0,
      updated: 0,
      status,
    }
  }
}

/// Result of one bulk run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameSummary {
  /// Offers and embedded options whose content changed.
  pub updated_count:     usize,
  /// Offers and embedded options examined, changed or not.
  pub total_offers:      usize,
  /// The `YYYYMMDD` suffix applied.
  pub date:              String,
  pub failed_activities: usize,
  pub activities:        Vec<ActivityOutcome>,
}

impl RenameSummary {
  fn new(date: String) -> Self {
    Self {
      updated_count: 0,
      total_offers: 0,
      date,
      failed_activities: 0,
      activities: Vec::new(),
    }
  }

  fn record(&mut self, outcome: ActivityOutcome) {
    match &outcome.status {
      OutcomeStatus::Failed { .. } => self.failed_activities += 1,
      _ => {
        self.updated_count += outcome.updated;
        self.total_offers += outcome.examined;
      }
    }
    self.activities.push(outcome);
  }
}

// ─── Run ─────────────────────────────────────────────────────────────────────

/// Rename the offers of every campaign activity, or of `target` alone.
///
/// Fails only when the activity list itself cannot be fetched, or when
/// `target` names no activity. Everything else is isolated per activity.
pub async fn run_bulk_rename<A: TargetApi>(
  api: &A,
  campaign: &Campaign,
  target: Option<&str>,
  clock: Clock,
) -> Result<RenameSummary> {
  let date = date_suffix(clock.today);
  let snapshot = fetch_snapshot(api).await?;

  let candidates = select_candidates(&snapshot.activities, campaign, target);
  if let Some(target) = target
    && candidates.is_empty()
  {
    return Err(Error::NotFound(format!("activity {} not found", target.trim())));
  }

  tracing::info!(
    candidates = candidates.len(),
    marker = campaign.marker(),
    %date,
    "starting bulk offer rename"
  );

  let run = Run {
    api,
    snapshot: &snapshot,
    date: &date,
    now: clock.now,
    targeted: target.is_some(),
    claimed: Mutex::new(HashSet::new()),
  };
  let outcomes = join_all(candidates.iter().map(|overview| run.activity(overview))).await;

  let mut summary = RenameSummary::new(date.clone());
  for outcome in outcomes {
    summary.record(outcome);
  }

  tracing::info!(
    updated = summary.updated_count,
    examined = summary.total_offers,
    failed = summary.failed_activities,
    "bulk offer rename finished"
  );
  Ok(summary)
}

struct Run<'a, A> {
  api:      &'a A,
  snapshot: &'a Snapshot,
  date:     &'a str,
  now:      DateTime<Utc>,
  /// A single targeted activity skips the detail-level lifetime check.
  targeted: bool,
  /// Remote offer ids already taken by some activity of this run.
  claimed:  Mutex<HashSet<String>>,
}

/// Counts from one activity that completed.
enum Processed {
  Done { examined: usize, updated: usize },
  Skipped(String),
}

impl<A: TargetApi> Run<'_, A> {
  async fn activity(&self, overview: &ActivityOverview) -> ActivityOutcome {
    match self.process(overview).await {
      Ok(Processed::Done { examined, updated }) => {
        let status = if updated > 0 {
          OutcomeStatus::Updated
        } else {
          OutcomeStatus::Unchanged
        };
        tracing::info!(activity_id = ?overview.id_string(), examined, updated, "activity processed");
        ActivityOutcome {
          examined,
          updated,
          ..ActivityOutcome::new(overview, status)
        }
      }
      Ok(Processed::Skipped(reason)) => {
        tracing::info!(activity_id = ?overview.id_string(), %reason, "activity skipped");
        ActivityOutcome::new(overview, OutcomeStatus::Skipped { reason })
      }
      Err(e) => {
        tracing::warn!(activity_id = ?overview.id_string(), error = %e, "activity failed");
        ActivityOutcome::new(overview, OutcomeStatus::Failed {
          error: e.to_string(),
        })
      }
    }
  }

  async fn process(&self, overview: &ActivityOverview) -> Result<Processed> {
    let id = overview
      .id_string()
      .ok_or_else(|| Error::Validation("activity without an id".to_owned()))?;
    let kind = overview.activity_type()?;

    let mut detail = self.api.activity_detail(kind, &id).await?;
    if !self.targeted && detail_has_lifetime_end(&detail) {
      return Ok(Processed::Skipped("activity has an end date".to_owned()));
    }

    let enriched = assemble(&detail, overview, &self.snapshot.audiences, self.now)?;

    let mut examined = 0;
    let mut embedded_updates = 0;
    let mut remote = Vec::new();

    for option in &enriched.options {
      match offer_source(option, &id, &self.snapshot.offers) {
        OfferSource::Embedded(content) => {
          examined += 1;
          let outcome = rename(content, self.date);
          if !outcome.changed {
            continue;
          }
          let replaced = option
            .option_local_id()
            .is_some_and(|local_id| replace_option_content(&mut detail, &local_id, outcome.content));
          if replaced {
            embedded_updates += 1;
          } else {
            tracing::warn!(activity_id = %id, "renamed option could not be located in the detail");
          }
        }
        OfferSource::Remote { id: offer_id, kind } => {
          let kind = kind.unwrap_or_else(|| "json".to_owned());
          if kind != "json" {
            tracing::debug!(%offer_id, %kind, "skipping non-json offer");
            continue;
          }
          if self.claim(&offer_id) {
            remote.push(offer_id);
          }
        }
        OfferSource::Missing => {}
      }
    }

    examined += remote.len();
    let changed = try_join_all(remote.iter().map(|offer_id| self.offer(offer_id))).await?;
    let offer_updates = changed.into_iter().filter(|c| *c).count();

    if embedded_updates > 0 {
      if let Some(map) = detail.as_object_mut() {
        for key in VOLATILE_ACTIVITY_FIELDS {
          map.shift_remove(key);
        }
      }
      self.api.update_activity(kind, &id, &detail).await?;
    }

    Ok(Processed::Done {
      examined,
      updated: embedded_updates + offer_updates,
    })
  }

  /// True for the first caller to claim `offer_id` in this run.
  fn claim(&self, offer_id: &str) -> bool {
    self
      .claimed
      .lock()
      .map(|mut claimed| claimed.insert(offer_id.to_owned()))
      .unwrap_or(false)
  }

  /// Fetch one json offer, rename it, and write it back if it changed.
  async fn offer(&self, id: &str) -> Result<bool> {
    let offer = self.api.offer_detail("json", id).await?;
    let outcome = rename(&offer.content, self.date);
    if !outcome.changed {
      return Ok(false);
    }

    let mut body = serde_json::to_value(Offer {
      content: outcome.content,
      ..offer
    })?;
    if let Some(map) = body.as_object_mut() {
      for key in VOLATILE_OFFER_FIELDS {
        map.shift_remove(key);
      }
    }
    self.api.update_offer("json", id, &body).await?;
    tracing::debug!(offer_id = id, "offer renamed");
    Ok(true)
  }
}

/// Replace the `content` of the detail option with `optionLocalId ==
/// local_id`. False when no such option exists.
fn replace_option_content(detail: &mut Value, local_id: &str, content: Value) -> bool {
  detail
    .get_mut("options")
    .and_then(Value::as_array_mut)
    .and_then(|options| {
      options.iter_mut().find(|option| {
        option.get("optionLocalId").and_then(normalize_id).as_deref() == Some(local_id)
      })
    })
    .and_then(Value::as_object_mut)
    .map(|option| option.insert("content".to_owned(), content))
    .is_some()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn option_content_is_replaced_by_local_id() {
    let mut detail = json!({
      "options": [
        { "optionLocalId": 0, "content": "a" },
        { "optionLocalId": "1", "content": "b" }
      ]
    });
    assert!(replace_option_content(&mut detail, "1", json!("c")));
    assert_eq!(detail["options"][1]["content"], "c");
    assert_eq!(detail["options"][0]["content"], "a");
    assert!(!replace_option_content(&mut detail, "9", json!("x")));
  }

  #[test]
  fn failed_activities_contribute_nothing() {
    let mut summary = RenameSummary::new("20240101".into());
    let overview: ActivityOverview = serde_json::from_value(json!({ "id": 1 })).unwrap();
    summary.record(ActivityOutcome {
      examined: 2,
      updated: 1,
      ..ActivityOutcome::new(&overview, OutcomeStatus::Updated)
    });
    summary.record(ActivityOutcome {
      examined: 5,
      updated: 5,
      ..ActivityOutcome::new(&overview, OutcomeStatus::Failed { error: "boom".into() })
    });
    assert_eq!(summary.updated_count, 1);
    assert_eq!(summary.total_offers, 2);
    assert_eq!(summary.failed_activities, 1);
  }

  #[test]
  fn outcome_serialises_status_inline() {
    let overview: ActivityOverview =
      serde_json::from_value(json!({ "id": 7, "name": "A" })).unwrap();
    let outcome = ActivityOutcome::new(&overview, OutcomeStatus::Skipped {
      reason: "activity has an end date".into(),
    });
    assert_eq!(
      serde_json::to_value(outcome).unwrap(),
      json!({
        "activityId": "7",
        "name": "A",
        "examined": 0,
        "updated": 0,
        "status": "skipped",
        "reason": "activity has an end date"
      })
    );
  }
}
