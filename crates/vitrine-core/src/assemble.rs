//! Activity graph assembly.
//!
//! Joins the ID-linked experiences, locations (mboxes) and options of an
//! activity detail payload into one ordered list of enriched options, and
//! resolves the activity's effective schedule.
//!
//! Every join is first-match-wins over the payload's declaration order:
//! - an experience binds to the first mbox any of its option locations names;
//! - an option binds to the first experience whose option locations name it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  activity::{ActivityOverview, Audience, Experience, Mbox, array_at, normalize_id, text_at},
  audience::{self, AudienceDetails},
  scheduling::{self, Scheduling},
};

pub const WHEN_ACTIVATED: &str = "when activated";
pub const WHEN_DEACTIVATED: &str = "when deactivated";

/// Fields dropped from the assembled activity; their content now lives in
/// the enriched options.
const JOINED_COLLECTIONS: [&str; 3] = ["locations", "experiences", "options"];

// ─── Output types ────────────────────────────────────────────────────────────

/// Sort key of an enriched option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ordination {
  pub priority: Value,
  /// 1-based index of the experience in declaration order.
  pub position: usize,
}

/// The part of an experience worth repeating on each of its options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceSummary {
  pub experience_local_id: Option<String>,
  pub name:                Option<String>,
  pub audience_ids:        Vec<Value>,
  pub location_local_id:   Option<String>,
  pub location_name:       Option<String>,
}

/// Everything an option gains from the experience it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
  pub audience_details:   AudienceDetails,
  pub ordination:         Ordination,
  pub experience:         ExperienceSummary,
  pub visitor_percentage: Option<Value>,
}

/// An upstream option, plus its enrichment when it matched an experience.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedOption {
  #[serde(flatten)]
  pub fields:     Map<String, Value>,
  #[serde(flatten)]
  pub enrichment: Option<Enrichment>,
}

impl EnrichedOption {
  pub fn option_local_id(&self) -> Option<String> {
    self.fields.get("optionLocalId").and_then(normalize_id)
  }

  pub fn offer_id(&self) -> Option<String> { self.fields.get("offerId").and_then(normalize_id) }

  /// Embedded content, if the option carries it directly.
  pub fn content(&self) -> Option<&Value> { self.fields.get("content").filter(|c| !c.is_null()) }

  pub fn position(&self) -> Option<usize> {
    self.enrichment.as_ref().map(|e| e.ordination.position)
  }

  pub fn audience_name(&self) -> Option<&str> {
    self
      .enrichment
      .as_ref()
      .map(|e| e.audience_details.name.as_str())
  }
}

/// The denormalised activity view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedActivity {
  /// Detail fields other than the joined collections and computed fields.
  #[serde(flatten)]
  pub fields:     Map<String, Value>,
  pub starts_at:  String,
  pub ends_at:    String,
  pub scheduling: Scheduling,
  pub options:    Vec<EnrichedOption>,
}

impl EnrichedActivity {
  pub fn id(&self) -> Option<String> { self.fields.get("id").and_then(normalize_id) }

  pub fn name(&self) -> Option<&str> { self.fields.get("name").and_then(Value::as_str) }
}

// ─── Assembly ────────────────────────────────────────────────────────────────

struct BoundExperience {
  position:   usize,
  experience: Experience,
  mbox:       Option<Mbox>,
}

/// Join `detail` into an [`EnrichedActivity`].
///
/// `overview` supplies fallbacks the detail may lack (type, priority, start
/// and end); `audiences` is the full audience collection; `now` drives the
/// scheduling classification.
pub fn assemble(
  detail: &Value,
  overview: &ActivityOverview,
  audiences: &[Audience],
  now: DateTime<Utc>,
) -> Result<EnrichedActivity> {
  let Some(object) = detail.as_object() else {
    return Err(Error::Validation(
      "activity details must be a JSON object".to_owned(),
    ));
  };

  let is_ab = text_at(detail, "type")
    .or(overview.kind.as_deref())
    .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("ab"));
  let priority = object
    .get("priority")
    .or_else(|| overview.extra.get("priority"))
    .cloned()
    .unwrap_or(Value::Null);

  let mboxes: Vec<Mbox> = detail
    .get("locations")
    .map(|locations| array_at(locations, "mboxes"))
    .unwrap_or_default()
    .iter()
    .map(Mbox::from_value)
    .collect();

  let experiences: Vec<BoundExperience> = array_at(detail, "experiences")
    .iter()
    .map(Experience::from_value)
    .enumerate()
    .map(|(index, experience)| {
      let mbox = mboxes
        .iter()
        .find(|m| {
          m.location_local_id
            .as_deref()
            .is_some_and(|id| experience.uses_location(id))
        })
        .cloned();
      BoundExperience {
        position: index + 1,
        experience,
        mbox,
      }
    })
    .collect();

  let mut options: Vec<EnrichedOption> = array_at(detail, "options")
    .iter()
    .filter_map(Value::as_object)
    .map(|fields| {
      let matched = fields
        .get("optionLocalId")
        .and_then(normalize_id)
        .and_then(|id| experiences.iter().find(|b| b.experience.serves_option(&id)));
      EnrichedOption {
        fields:     fields.clone(),
        enrichment: matched.map(|bound| enrich(bound, is_ab, &priority, audiences)),
      }
    })
    .collect();

  // Stable: ties and unmatched options keep their declaration order.
  options.sort_by_key(|o| o.position().unwrap_or(usize::MAX));

  let starts_at = text_at(detail, "startsAt")
    .or_else(|| detail.get("lifetime").and_then(|l| text_at(l, "start")))
    .or_else(|| overview.starts_at())
    .map(str::to_owned);
  let ends_at = text_at(detail, "endsAt")
    .or_else(|| detail.get("lifetime").and_then(|l| text_at(l, "end")))
    .or_else(|| overview.ends_at())
    .map(str::to_owned);

  let scheduling = scheduling::classify(
    now,
    starts_at.as_deref().and_then(scheduling::parse_timestamp),
    ends_at.as_deref().and_then(scheduling::parse_timestamp),
  );

  let mut fields = object.clone();
  for key in JOINED_COLLECTIONS
    .iter()
    .chain(&["startsAt", "endsAt", "scheduling"])
  {
    fields.shift_remove(*key);
  }

  Ok(EnrichedActivity {
    fields,
    starts_at: starts_at.unwrap_or_else(|| WHEN_ACTIVATED.to_owned()),
    ends_at: ends_at.unwrap_or_else(|| WHEN_DEACTIVATED.to_owned()),
    scheduling,
    options,
  })
}

fn enrich(
  bound: &BoundExperience,
  is_ab: bool,
  priority: &Value,
  audiences: &[Audience],
) -> Enrichment {
  let experience = &bound.experience;
  // A/B activities target through the location; XT through the experience.
  let audience_ids: &[Value] = if is_ab {
    bound
      .mbox
      .as_ref()
      .map(|m| m.audience_ids.as_slice())
      .unwrap_or_default()
  } else {
    &experience.audience_ids
  };

  Enrichment {
    audience_details:   audience::resolve(audience_ids, audiences),
    ordination:         Ordination {
      priority: priority.clone(),
      position: bound.position,
    },
    experience:         ExperienceSummary {
      experience_local_id: experience.experience_local_id.clone(),
      name:                experience.name.clone(),
      audience_ids:        experience.audience_ids.clone(),
      location_local_id:   bound.mbox.as_ref().and_then(|m| m.location_local_id.clone()),
      location_name:       bound.mbox.as_ref().and_then(|m| m.name.clone()),
    },
    visitor_percentage: experience.visitor_percentage.clone(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::audience::{ALL_VISITORS, AUDIENCE_NOT_FOUND};

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap() }

  fn audiences() -> Vec<Audience> {
    serde_json::from_value(json!([
      { "id": 11, "name": "Mobile" },
      { "id": 22, "name": "Desktop" },
      { "id": 33, "name": "Returning" }
    ]))
    .unwrap()
  }

  fn overview(kind: &str) -> ActivityOverview {
    serde_json::from_value(json!({ "id": 900, "type": kind, "priority": 3 })).unwrap()
  }

  fn three_experience_detail(kind: &str) -> Value {
    json!({
      "id": 900,
      "type": kind,
      "name": "Trava Telas home",
      "workspace": "default",
      "locations": { "mboxes": [
        { "locationLocalId": 0, "name": "home-top", "audienceIds": [11] },
        { "locationLocalId": 1, "name": "home-bottom", "audienceIds": [22] }
      ]},
      "experiences": [
        { "experienceLocalId": 0, "name": "A", "audienceIds": [33], "visitorPercentage": 50,
          "optionLocations": [
            { "locationLocalId": 0, "optionLocalId": 5 },
            { "locationLocalId": 0, "optionLocalId": 1 }
          ] },
        { "experienceLocalId": 1, "name": "B", "audienceIds": [],
          "optionLocations": [{ "locationLocalId": 1, "optionLocalId": 4 }] },
        { "experienceLocalId": 2, "name": "C",
          "optionLocations": [
            { "locationLocalId": 9, "optionLocalId": 2 },
            { "locationLocalId": 9, "optionLocalId": 3 }
          ] }
      ],
      "options": [
        { "optionLocalId": 3, "offerId": 703 },
        { "optionLocalId": 1, "offerId": 701 },
        { "optionLocalId": 4, "offerId": 704 },
        { "optionLocalId": 2, "offerId": 702 },
        { "optionLocalId": 5, "offerId": 705 }
      ]
    })
  }

  #[test]
  fn options_sort_by_experience_position() {
    let activity =
      assemble(&three_experience_detail("ab"), &overview("ab"), &audiences(), now()).unwrap();

    let positions: Vec<_> = activity.options.iter().map(|o| o.position().unwrap()).collect();
    assert_eq!(positions, vec![1, 1, 2, 3, 3]);

    // Ties keep declaration order of the options themselves.
    let offers: Vec<_> = activity.options.iter().map(|o| o.offer_id().unwrap()).collect();
    assert_eq!(offers, vec!["701", "705", "704", "703", "702"]);
  }

  #[test]
  fn ab_audiences_come_from_the_location() {
    let activity =
      assemble(&three_experience_detail("ab"), &overview("ab"), &audiences(), now()).unwrap();
    let names: Vec<_> = activity.options.iter().map(|o| o.audience_name().unwrap()).collect();
    // Experience C binds to no mbox: empty ids, not an error.
    assert_eq!(names, vec!["Mobile", "Mobile", "Desktop", ALL_VISITORS, ALL_VISITORS]);

    let first = activity.options[0].enrichment.as_ref().unwrap();
    assert_eq!(first.ordination.priority, json!(3));
    assert_eq!(first.experience.location_name.as_deref(), Some("home-top"));
    assert_eq!(first.visitor_percentage, Some(json!(50)));
  }

  #[test]
  fn xt_audiences_come_from_the_experience() {
    let activity =
      assemble(&three_experience_detail("xt"), &overview("xt"), &audiences(), now()).unwrap();
    let names: Vec<_> = activity.options.iter().map(|o| o.audience_name().unwrap()).collect();
    assert_eq!(names, vec!["Returning", "Returning", ALL_VISITORS, ALL_VISITORS, ALL_VISITORS]);
  }

  #[test]
  fn unmatched_options_pass_through_last() {
    let detail = json!({
      "id": 1,
      "type": "xt",
      "experiences": [
        { "experienceLocalId": 0, "audienceIds": [404],
          "optionLocations": [{ "locationLocalId": 0, "optionLocalId": 0 }] }
      ],
      "options": [
        { "optionLocalId": 99, "offerId": 1 },
        { "optionLocalId": 0, "offerId": 2 },
        { "name": "no local id", "offerId": 3 }
      ]
    });
    let activity = assemble(&detail, &ActivityOverview::default(), &audiences(), now()).unwrap();

    assert_eq!(activity.options.len(), 3);
    assert_eq!(activity.options[0].offer_id().as_deref(), Some("2"));
    assert_eq!(activity.options[0].audience_name(), Some(AUDIENCE_NOT_FOUND));
    assert!(activity.options[1].enrichment.is_none());
    assert!(activity.options[2].enrichment.is_none());

    let raw = serde_json::to_value(&activity.options[1]).unwrap();
    assert_eq!(raw, json!({ "optionLocalId": 99, "offerId": 1 }));
  }

  #[test]
  fn joined_collections_are_stripped() {
    let activity =
      assemble(&three_experience_detail("ab"), &overview("ab"), &audiences(), now()).unwrap();
    let raw = serde_json::to_value(&activity).unwrap();
    assert!(raw.get("locations").is_none());
    assert!(raw.get("experiences").is_none());
    assert_eq!(raw["options"].as_array().unwrap().len(), 5);
    assert_eq!(raw["workspace"], "default");
    assert_eq!(raw["options"][0]["ordination"]["position"], 1);
    assert_eq!(raw["options"][0]["audienceDetails"]["name"], "Mobile");
  }

  #[test]
  fn missing_dates_fall_back_to_overview_then_placeholders() {
    let detail = json!({ "id": 1, "type": "ab" });
    let activity = assemble(&detail, &overview("ab"), &[], now()).unwrap();
    assert_eq!(activity.starts_at, WHEN_ACTIVATED);
    assert_eq!(activity.ends_at, WHEN_DEACTIVATED);
    assert_eq!(activity.scheduling, Scheduling::Live);
    assert!(activity.options.is_empty());

    let overview: ActivityOverview = serde_json::from_value(json!({
      "id": 1,
      "lifetime": { "start": "2024-07-01T00:00:00Z" }
    }))
    .unwrap();
    let activity = assemble(&detail, &overview, &[], now()).unwrap();
    assert_eq!(activity.starts_at, "2024-07-01T00:00:00Z");
    assert_eq!(activity.ends_at, WHEN_DEACTIVATED);
    assert_eq!(activity.scheduling, Scheduling::Scheduled);
  }

  #[test]
  fn detail_dates_win_over_overview() {
    let detail = json!({
      "id": 1,
      "startsAt": "2024-01-01T00:00:00Z",
      "endsAt": "2024-02-01T00:00:00Z"
    });
    let activity = assemble(&detail, &overview("ab"), &[], now()).unwrap();
    assert_eq!(activity.scheduling, Scheduling::Expired);
    assert_eq!(activity.ends_at, "2024-02-01T00:00:00Z");
  }

  #[test]
  fn non_object_detail_is_rejected() {
    let err = assemble(&json!([1, 2]), &overview("ab"), &[], now()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
