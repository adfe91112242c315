//! JSON REST API over the remote testing platform.
//!
//! Exposes an axum [`Router`] backed by any [`TargetApi`]. Tracing layers,
//! TLS and the listener are the caller's responsibility.

pub mod activities;
pub mod automation;
pub mod error;
pub mod offers;

use std::sync::Arc;

use axum::{
  Json, Router,
  http::StatusCode,
  response::IntoResponse,
  routing::{get, post},
};
use serde_json::json;
use vitrine_automation::Campaign;
use vitrine_core::api::TargetApi;

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<A> {
  pub api:      Arc<A>,
  pub campaign: Arc<Campaign>,
}

impl<A> Clone for AppState<A> {
  fn clone(&self) -> Self {
    Self {
      api:      self.api.clone(),
      campaign: self.campaign.clone(),
    }
  }
}

impl<A> AppState<A> {
  pub fn new(api: A, campaign: Campaign) -> Self {
    Self {
      api:      Arc::new(api),
      campaign: Arc::new(campaign),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<A>(state: AppState<A>) -> Router
where
  A: TargetApi + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Activities
    .route("/activities", get(activities::list::<A>))
    .route("/activities/{id}", get(activities::get_one::<A>))
    .route("/activities/{id}/offers", get(activities::offers::<A>))
    // Offers
    .route("/offers", get(offers::list::<A>))
    .route("/offers/approved", get(offers::approved::<A>))
    .route("/offers/{offer_id}", get(offers::get_one::<A>))
    // Automation
    .route("/automation/trava-telas", get(automation::campaign_offers::<A>))
    .route("/automation/trava-telas/rename", post(automation::rename_all::<A>))
    .route(
      "/automation/trava-telas/rename/{activity_id}",
      post(automation::rename_one::<A>),
    )
    .fallback(not_found)
    .with_state(state)
}

async fn health() -> Json<serde_json::Value> { Json(json!({ "status": "ok" })) }

async fn not_found() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(json!({ "message": "Route not found" })))
}
