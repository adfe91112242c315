//! Campaign automation over a [`vitrine_core::api::TargetApi`].
//!
//! - [`bulk::run_bulk_rename`] rewrites the date suffix of every offer served
//!   by the campaign's activities, isolating failures per activity.
//! - [`listing::collect_campaign_offers`] lists those offers without writing.

pub mod bulk;
pub mod campaign;
pub mod listing;

pub use bulk::{ActivityOutcome, OutcomeStatus, RenameSummary, run_bulk_rename};
pub use campaign::{Campaign, Clock, DEFAULT_CAMPAIGN_MARKER};
pub use listing::{CampaignOffer, CampaignOffers, collect_campaign_offers};
