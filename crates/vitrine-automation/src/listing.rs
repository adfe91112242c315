//! Read-only listing of every offer the campaign's activities serve.

use futures::future::{Either, join_all, ready};
use serde::Serialize;
use serde_json::Value;
use vitrine_core::{
  Result,
  activity::ActivityOverview,
  api::TargetApi,
  assemble::{EnrichedOption, assemble},
  scheduling::Scheduling,
};

use crate::campaign::{
  Campaign, Clock, OfferSource, Snapshot, fetch_snapshot, offer_source, select_candidates,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignOffer {
  pub activity_id:     String,
  pub activity_name:   Option<String>,
  pub scheduling:      Scheduling,
  pub starts_at:       String,
  pub ends_at:         String,
  pub audience:        Option<String>,
  pub position:        Option<usize>,
  pub option_local_id: Option<String>,
  pub offer_id:        Option<String>,
  pub offer_type:      Option<String>,
  pub offer_name:      Option<String>,
  pub content:         Value,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:           Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignOffers {
  pub total_offers: usize,
  pub offers:       Vec<CampaignOffer>,
}

/// Collect the offers behind every approved, evergreen campaign activity.
///
/// An activity whose detail cannot be fetched or assembled is left out; an
/// offer whose detail cannot be fetched is listed with `content: null` and the
/// error message.
pub async fn collect_campaign_offers<A: TargetApi>(
  api: &A,
  campaign: &Campaign,
  clock: Clock,
) -> Result<CampaignOffers> {
  let snapshot = fetch_snapshot(api).await?;
  let candidates = select_candidates(&snapshot.activities, campaign, None);

  let per_activity = join_all(
    candidates
      .iter()
      .map(|overview| activity_offers(api, &snapshot, overview, clock)),
  )
  .await;

  let offers: Vec<CampaignOffer> = candidates
    .iter()
    .zip(per_activity)
    .filter_map(|(overview, result)| {
      result
        .inspect_err(|e| {
          tracing::warn!(activity_id = ?overview.id_string(), error = %e, "skipping activity in offer listing");
        })
        .ok()
    })
    .flatten()
    .collect();

  Ok(CampaignOffers {
    total_offers: offers.len(),
    offers,
  })
}

async fn activity_offers<A: TargetApi>(
  api: &A,
  snapshot: &Snapshot,
  overview: &ActivityOverview,
  clock: Clock,
) -> Result<Vec<CampaignOffer>> {
  let id = overview.id_string().unwrap_or_default();
  let detail = api.activity_detail(overview.activity_type()?, &id).await?;
  let enriched = assemble(&detail, overview, &snapshot.audiences, clock.now)?;

  let entry = |option: &EnrichedOption| CampaignOffer {
    activity_id:     id.clone(),
    activity_name:   enriched.name().map(str::to_owned).or_else(|| overview.name.clone()),
    scheduling:      enriched.scheduling,
    starts_at:       enriched.starts_at.clone(),
    ends_at:         enriched.ends_at.clone(),
    audience:        option.audience_name().map(str::to_owned),
    position:        option.position(),
    option_local_id: option.option_local_id(),
    offer_id:        option.offer_id(),
    offer_type:      None,
    offer_name:      None,
    content:         Value::Null,
    error:           None,
  };

  let fetches = enriched.options.iter().filter_map(|option| {
    let base = entry(option);
    match offer_source(option, &id, &snapshot.offers) {
      OfferSource::Embedded(content) => {
        Some(Either::Left(ready(CampaignOffer {
          content: content.clone(),
          ..base
        })))
      }
      OfferSource::Remote { id: offer_id, kind } => {
        let kind = kind.unwrap_or_else(|| "json".to_owned());
        Some(Either::Right(async move {
          match api.offer_detail(&kind, &offer_id).await {
            Ok(offer) => CampaignOffer {
              offer_type: Some(kind),
              offer_name: offer.name,
              content: offer.content,
              offer_id: Some(offer_id),
              ..base
            },
            Err(e) => CampaignOffer {
              offer_type: Some(kind),
              error: Some(e.to_string()),
              offer_id: Some(offer_id),
              ..base
            },
          }
        }))
      }
      OfferSource::Missing => None,
    }
  });

  Ok(join_all(fetches).await)
}
