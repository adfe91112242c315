//! Handlers for `/activities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/activities` | `?activityName` filters by name; other params are forwarded |
//! | `GET`  | `/activities/{id}` | Assembled activity with enriched options |
//! | `GET`  | `/activities/{id}/offers` | Offer references found in the activity detail |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use vitrine_automation::campaign::fetch_audiences;
use vitrine_core::{
  activity::{ActivityOverview, OfferReference},
  api::TargetApi,
  assemble::{EnrichedActivity, assemble},
  scan,
};

use crate::{
  AppState,
  error::{ApiError, Context},
};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
  pub id:   Value,
  #[serde(rename = "type")]
  pub kind: Option<String>,
}

/// `GET /activities[?activityName=...][&...]`
pub async fn list<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Query(mut params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
  let name = take_param(&mut params, "activityName").map(|n| n.trim().to_lowercase());

  let activities = state
    .api
    .list_activities(&params)
    .await
    .context("Unable to fetch activities")?;

  let entries = activities
    .into_iter()
    .filter(|a| match &name {
      Some(needle) => a
        .name
        .as_deref()
        .is_some_and(|n| n.to_lowercase().contains(needle.as_str())),
      None => true,
    })
    .map(|a| ActivityEntry {
      id:   a.id,
      kind: a.kind,
    })
    .collect();
  Ok(Json(entries))
}

/// Remove `key` from `params`, returning its first non-blank value.
pub(crate) fn take_param(params: &mut Vec<(String, String)>, key: &str) -> Option<String> {
  let mut found = None;
  params.retain(|(k, v)| {
    if k != key {
      return true;
    }
    if found.is_none() && !v.trim().is_empty() {
      found = Some(v.clone());
    }
    false
  });
  found
}

// ─── Detail ──────────────────────────────────────────────────────────────────

async fn find_overview<A: TargetApi>(api: &A, id: &str) -> Result<ActivityOverview, ApiError> {
  let id = id.trim();
  api
    .list_activities(&[])
    .await
    .context("Unable to fetch activities")?
    .into_iter()
    .find(|a| a.id_string().as_deref() == Some(id))
    .ok_or_else(|| ApiError::NotFound(format!("Activity with ID {id} not found")))
}

/// `GET /activities/{id}`
pub async fn get_one<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Path(id): Path<String>,
) -> Result<Json<EnrichedActivity>, ApiError> {
  let (overview, audiences) =
    tokio::join!(find_overview(state.api.as_ref(), &id), fetch_audiences(state.api.as_ref()));
  let overview = overview?;
  let kind = overview
    .activity_type()
    .context("Unsupported activity type")?;

  let detail = state
    .api
    .activity_detail(kind, id.trim())
    .await
    .context("Unable to fetch activity details")?;
  let activity = assemble(&detail, &overview, &audiences, Utc::now())
    .context("Unable to assemble activity")?;
  Ok(Json(activity))
}

/// `GET /activities/{id}/offers`
pub async fn offers<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<OfferReference>>, ApiError> {
  let overview = find_overview(state.api.as_ref(), &id).await?;
  let kind = overview
    .activity_type()
    .context("Unsupported activity type")?;

  let detail = state
    .api
    .activity_detail(kind, id.trim())
    .await
    .context("Unable to fetch activity details")?;
  Ok(Json(scan::scan(&detail, id.trim())))
}
