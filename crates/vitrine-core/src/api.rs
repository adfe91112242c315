//! The `TargetApi` trait: everything the view and the automation need from
//! the remote platform.
//!
//! The trait is implemented by `vitrine-client` over HTTP and by
//! [`crate::test_utils::MemoryTarget`] in memory. Higher layers
//! (`vitrine-automation`, `vitrine-api`) depend on this abstraction only.
//!
//! Each call maps to exactly one upstream request. There are no retries: a
//! failed call is reported as [`crate::Error::RemoteApi`] (or
//! [`crate::Error::Auth`] when no token could be obtained) and the caller
//! decides whether that is fatal.

use std::future::Future;

use serde_json::Value;

use crate::{
  Result,
  activity::{ActivityOverview, ActivityType, Audience, Offer, OfferSummary},
};

/// Query-string pairs forwarded verbatim to list endpoints.
pub type QueryParams = [(String, String)];

/// Abstraction over the remote testing platform.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TargetApi: Send + Sync {
  // ── Activities ────────────────────────────────────────────────────────

  /// List activity overviews.
  fn list_activities<'a>(
    &'a self,
    query: &'a QueryParams,
  ) -> impl Future<Output = Result<Vec<ActivityOverview>>> + Send + 'a;

  /// Fetch the full detail payload of one activity.
  fn activity_detail<'a>(
    &'a self,
    kind: ActivityType,
    id: &'a str,
  ) -> impl Future<Output = Result<Value>> + Send + 'a;

  /// Replace a whole activity. `body` must already be stripped of computed
  /// fields the platform refuses on write.
  fn update_activity<'a>(
    &'a self,
    kind: ActivityType,
    id: &'a str,
    body: &'a Value,
  ) -> impl Future<Output = Result<Value>> + Send + 'a;

  // ── Audiences ─────────────────────────────────────────────────────────

  fn list_audiences(&self) -> impl Future<Output = Result<Vec<Audience>>> + Send + '_;

  // ── Offers ────────────────────────────────────────────────────────────

  /// List offer summaries (no content).
  fn list_offers<'a>(
    &'a self,
    query: &'a QueryParams,
  ) -> impl Future<Output = Result<Vec<OfferSummary>>> + Send + 'a;

  /// Fetch one offer, content included. `kind` is the offer type path
  /// segment (e.g. `"json"`).
  fn offer_detail<'a>(
    &'a self,
    kind: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<Offer>> + Send + 'a;

  /// Replace an offer's definition.
  fn update_offer<'a>(
    &'a self,
    kind: &'a str,
    id: &'a str,
    body: &'a Value,
  ) -> impl Future<Output = Result<Value>> + Send + 'a;
}
