//! Handlers for `/offers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/offers` | `?status=approved` or `?approvalStatus=approved` keeps approved offers |
//! | `GET`  | `/offers/approved` | Approved offers only |
//! | `GET`  | `/offers/{offerId}` | Full offer, fetched by its listed type |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Serialize;
use vitrine_core::{
  activity::{Offer, OfferSummary},
  api::TargetApi,
};

use crate::{
  AppState,
  error::{ApiError, Context},
};

#[derive(Debug, Serialize)]
pub struct OfferList {
  pub total:  usize,
  pub offers: Vec<OfferSummary>,
}

impl From<Vec<OfferSummary>> for OfferList {
  fn from(offers: Vec<OfferSummary>) -> Self {
    Self {
      total: offers.len(),
      offers,
    }
  }
}

fn approval_filter(params: &[(String, String)]) -> bool {
  ["status", "approvalStatus"]
    .iter()
    .find_map(|key| {
      params
        .iter()
        .find(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| v.trim().to_ascii_lowercase())
    })
    .is_some_and(|status| status == "approved")
}

/// `GET /offers[?status=...][&approvalStatus=...][&...]`
pub async fn list<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Query(mut params): Query<Vec<(String, String)>>,
) -> Result<Json<OfferList>, ApiError> {
  let approved_only = approval_filter(&params);
  if approved_only {
    params.retain(|(k, _)| k != "status");
  }

  let mut offers = state
    .api
    .list_offers(&params)
    .await
    .context("Unable to fetch offers")?;
  if approved_only {
    offers.retain(OfferSummary::is_approved);
  }
  Ok(Json(offers.into()))
}

/// `GET /offers/approved[?...]`
pub async fn approved<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<OfferList>, ApiError> {
  let mut offers = state
    .api
    .list_offers(&params)
    .await
    .context("Unable to fetch approved offers")?;
  offers.retain(OfferSummary::is_approved);
  Ok(Json(offers.into()))
}

/// `GET /offers/{offerId}`
///
/// Looks the offer up by id through the list endpoint to learn its type,
/// then fetches the full definition from the type-specific path.
pub async fn get_one<A: TargetApi + 'static>(
  State(state): State<AppState<A>>,
  Path(offer_id): Path<String>,
) -> Result<Json<Offer>, ApiError> {
  let offer_id = offer_id.trim();
  let search = [("search".to_owned(), offer_id.to_owned())];
  let matches = state
    .api
    .list_offers(&search)
    .await
    .context("Unable to fetch offer details")?;

  let summary = matches
    .iter()
    .find(|o| o.id_string().as_deref() == Some(offer_id))
    .or_else(|| matches.first())
    .ok_or_else(|| ApiError::NotFound(format!("Offer with ID {offer_id} not found")))?;
  let kind = summary.normalized_kind().unwrap_or_else(|| "json".to_owned());

  let mut offer = state
    .api
    .offer_detail(&kind, offer_id)
    .await
    .context("Unable to fetch offer details")?;
  offer.kind = Some(kind);
  Ok(Json(offer))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect()
  }

  #[test]
  fn approval_filter_reads_status_then_approval_status() {
    assert!(approval_filter(&params(&[("status", "Approved")])));
    assert!(approval_filter(&params(&[("approvalStatus", "approved")])));
    assert!(!approval_filter(&params(&[("status", "draft"), ("approvalStatus", "approved")])));
    assert!(!approval_filter(&params(&[("limit", "5")])));
  }
}
