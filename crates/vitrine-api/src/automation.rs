//! Handlers for the campaign automation endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/automation/trava-telas` | Offers served by the campaign's activities |
//! | `POST` | `/automation/trava-telas/rename` | Bulk date-suffix rename |
//! | `POST` | `/automation/trava-telas/rename/{activityId}` | Rename for one activity |

use axum::{
  Json,
  extract::{Path, State},
};
use vitrine_automation::{
  CampaignOffers, Clock, RenameSummary, collect_campaign_offers, run_bulk_rename,
};
use vitrine_core::api::TargetApi;

use crate::{
  AppState,
  error::{ApiError, Context},
};

/// `GET /automation/trava-telas`
pub async fn campaign_offers<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
) -> Result<Json<CampaignOffers>, ApiError> {
  let offers = collect_campaign_offers(state.api.as_ref(), &state.campaign, Clock::system())
    .await
    .context("Unable to fetch approved campaign offers")?;
  Ok(Json(offers))
}

/// `POST /automation/trava-telas/rename`
pub async fn rename_all<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
) -> Result<Json<RenameSummary>, ApiError> {
  let summary = run_bulk_rename(state.api.as_ref(), &state.campaign, None, Clock::system())
    .await
    .context("Unable to rename campaign offers")?;
  Ok(Json(summary))
}

/// `POST /automation/trava-telas/rename/{activityId}`
pub async fn rename_one<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Path(activity_id): Path<String>,
) -> Result<Json<RenameSummary>, ApiError> {
  let summary = run_bulk_rename(
    state.api.as_ref(),
    &state.campaign,
    Some(&activity_id),
    Clock::system(),
  )
  .await
  .context(format!("Unable to rename offers of activity {activity_id}"))?;
  Ok(Json(summary))
}
