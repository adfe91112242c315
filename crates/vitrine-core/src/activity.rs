//! Records mirrored from the remote testing platform.
//!
//! Upstream payloads are only loosely specified, so every record keeps the
//! fields it does not name in a flattened `extra` map and round-trips them
//! unchanged. Identifiers arrive as JSON numbers or strings; they are always
//! compared through [`normalize_id`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// The comparable text form of an upstream identifier.
///
/// Strings are trimmed, numbers are printed; anything else (including an
/// empty string) is not an identifier.
pub fn normalize_id(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => {
      let trimmed = s.trim();
      (!trimmed.is_empty()).then(|| trimmed.to_owned())
    }
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Non-empty trimmed string at `key`, if the value is an object.
pub(crate) fn text_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
  value
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
}

/// The array at `key`, or an empty slice when it is missing or not an array.
pub(crate) fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
  value
    .get(key)
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default()
}

// ─── Activity type ───────────────────────────────────────────────────────────

/// The two activity kinds whose details can be fetched and joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
  /// A/B test.
  Ab,
  /// Experience targeting.
  Xt,
}

impl ActivityType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ab => "ab",
      Self::Xt => "xt",
    }
  }
}

impl FromStr for ActivityType {
  type Err = Error;

  fn from_str(raw: &str) -> Result<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "ab" => Ok(Self::Ab),
      "xt" => Ok(Self::Xt),
      other => Err(Error::Validation(format!(
        "unsupported activity type {other:?}, expected \"ab\" or \"xt\""
      ))),
    }
  }
}

impl fmt::Display for ActivityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Activity overview ───────────────────────────────────────────────────────

/// Start/end window as reported by the activity list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end:   Option<String>,
}

impl Lifetime {
  /// `true` when an end date is actually set (blank strings do not count).
  pub fn has_end(&self) -> bool {
    self.end.as_deref().is_some_and(|end| !end.trim().is_empty())
  }
}

/// The lightweight activity record returned by the list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityOverview {
  #[serde(default)]
  pub id:       Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:     Option<String>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lifetime: Option<Lifetime>,
  #[serde(flatten)]
  pub extra:    Map<String, Value>,
}

impl ActivityOverview {
  pub fn id_string(&self) -> Option<String> { normalize_id(&self.id) }

  /// The activity kind, if it is one whose details can be fetched.
  pub fn activity_type(&self) -> Result<ActivityType> {
    self.kind.as_deref().unwrap_or_default().parse()
  }

  /// Lower-cased, trimmed state (e.g. `"approved"`).
  pub fn normalized_state(&self) -> String {
    self
      .state
      .as_deref()
      .unwrap_or_default()
      .trim()
      .to_ascii_lowercase()
  }

  pub fn has_lifetime_end(&self) -> bool {
    self.lifetime.as_ref().is_some_and(Lifetime::has_end)
  }

  /// `startsAt`, falling back to `lifetime.start`.
  pub fn starts_at(&self) -> Option<&str> {
    self
      .extra
      .get("startsAt")
      .and_then(Value::as_str)
      .or_else(|| self.lifetime.as_ref()?.start.as_deref())
      .filter(|s| !s.trim().is_empty())
  }

  /// `endsAt`, falling back to `lifetime.end`.
  pub fn ends_at(&self) -> Option<&str> {
    self
      .extra
      .get("endsAt")
      .and_then(Value::as_str)
      .or_else(|| self.lifetime.as_ref()?.end.as_deref())
      .filter(|s| !s.trim().is_empty())
  }
}

/// `true` when an activity detail payload carries a non-blank `lifetime.end`.
pub fn detail_has_lifetime_end(detail: &Value) -> bool {
  detail
    .get("lifetime")
    .is_some_and(|lifetime| text_at(lifetime, "end").is_some())
}

// ─── Experiences, locations, options ─────────────────────────────────────────

/// One `{locationLocalId, optionLocalId}` pair inside an experience.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionLocation {
  pub location_local_id: Option<String>,
  pub option_local_id:   Option<String>,
}

/// One arm of an activity, read defensively from the detail payload.
#[derive(Debug, Clone, Default)]
pub struct Experience {
  pub experience_local_id: Option<String>,
  pub name:                Option<String>,
  pub audience_ids:        Vec<Value>,
  pub option_locations:    Vec<OptionLocation>,
  pub visitor_percentage:  Option<Value>,
}

impl Experience {
  pub fn from_value(value: &Value) -> Self {
    Self {
      experience_local_id: value.get("experienceLocalId").and_then(normalize_id),
      name:                text_at(value, "name").map(str::to_owned),
      audience_ids:        array_at(value, "audienceIds").to_vec(),
      option_locations:    array_at(value, "optionLocations")
        .iter()
        .map(|ol| OptionLocation {
          location_local_id: ol.get("locationLocalId").and_then(normalize_id),
          option_local_id:   ol.get("optionLocalId").and_then(normalize_id),
        })
        .collect(),
      visitor_percentage:  value
        .get("visitorPercentage")
        .filter(|v| !v.is_null())
        .cloned(),
    }
  }

  /// Whether any of this experience's option locations names `location_id`.
  pub fn uses_location(&self, location_id: &str) -> bool {
    self
      .option_locations
      .iter()
      .any(|ol| ol.location_local_id.as_deref() == Some(location_id))
  }

  /// Whether any of this experience's option locations names `option_id`.
  pub fn serves_option(&self, option_id: &str) -> bool {
    self
      .option_locations
      .iter()
      .any(|ol| ol.option_local_id.as_deref() == Some(option_id))
  }
}

/// A delivery location (mbox) from `locations.mboxes`.
#[derive(Debug, Clone, Default)]
pub struct Mbox {
  pub location_local_id: Option<String>,
  pub name:              Option<String>,
  pub audience_ids:      Vec<Value>,
}

impl Mbox {
  pub fn from_value(value: &Value) -> Self {
    Self {
      location_local_id: value.get("locationLocalId").and_then(normalize_id),
      name:              text_at(value, "name").map(str::to_owned),
      audience_ids:      array_at(value, "audienceIds").to_vec(),
    }
  }
}

// ─── Audiences ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audience {
  #[serde(default)]
  pub id:    Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind:  Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

// ─── Offers ──────────────────────────────────────────────────────────────────

/// An offer as listed by the offers endpoint (no content).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferSummary {
  #[serde(default)]
  pub id:    Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind:  Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl OfferSummary {
  pub fn id_string(&self) -> Option<String> { normalize_id(&self.id) }

  /// Lower-cased offer type, if the listing reported one.
  pub fn normalized_kind(&self) -> Option<String> {
    self
      .kind
      .as_deref()
      .map(|k| k.trim().to_ascii_lowercase())
      .filter(|k| !k.is_empty())
  }

  /// Lower-cased approval status from `status`, `approvalStatus` or `state`.
  pub fn approval_status(&self) -> Option<String> {
    ["status", "approvalStatus", "state"]
      .iter()
      .find_map(|key| self.extra.get(*key).and_then(Value::as_str))
      .map(|s| s.trim().to_ascii_lowercase())
  }

  pub fn is_approved(&self) -> bool {
    self.approval_status().as_deref() == Some("approved")
  }
}

/// A full offer, including its content payload.
///
/// `content` is either an object or a JSON-encoded string, depending on the
/// offer type and on how it was authored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Offer {
  #[serde(default)]
  pub id:      Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:    Option<String>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind:    Option<String>,
  #[serde(default)]
  pub content: Value,
  #[serde(flatten)]
  pub extra:   Map<String, Value>,
}

/// A de-duplicated pointer to an offer discovered inside an activity payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferReference {
  pub id:   String,
  #[serde(rename = "type")]
  pub kind: String,
}

impl OfferReference {
  pub fn json(id: impl Into<String>) -> Self {
    Self {
      id:   id.into(),
      kind: "json".to_owned(),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn ids_compare_by_text() {
    assert_eq!(normalize_id(&json!(42)), Some("42".into()));
    assert_eq!(normalize_id(&json!(" 42 ")), Some("42".into()));
    assert_eq!(normalize_id(&json!("")), None);
    assert_eq!(normalize_id(&json!(null)), None);
    assert_eq!(normalize_id(&json!({"id": 1})), None);
  }

  #[test]
  fn activity_type_parses_case_insensitively() {
    assert_eq!("AB".parse::<ActivityType>().unwrap(), ActivityType::Ab);
    assert_eq!(" xt ".parse::<ActivityType>().unwrap(), ActivityType::Xt);
    assert!(matches!(
      "mvt".parse::<ActivityType>(),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn overview_round_trips_unknown_fields() {
    let raw = json!({
      "id": 7,
      "name": "Home banner",
      "type": "ab",
      "state": "approved",
      "priority": 5,
      "lifetime": { "start": "2024-01-01T00:00:00Z" }
    });
    let overview: ActivityOverview = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(overview.id_string().as_deref(), Some("7"));
    assert!(!overview.has_lifetime_end());
    assert_eq!(overview.starts_at(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(serde_json::to_value(&overview).unwrap(), raw);
  }

  #[test]
  fn blank_lifetime_end_is_not_an_end() {
    let overview: ActivityOverview =
      serde_json::from_value(json!({ "id": 1, "lifetime": { "end": "  " } })).unwrap();
    assert!(!overview.has_lifetime_end());
    assert!(detail_has_lifetime_end(&json!({ "lifetime": { "end": "2030-01-01T00:00:00Z" } })));
    assert!(!detail_has_lifetime_end(&json!({ "lifetime": {} })));
  }

  #[test]
  fn offer_approval_reads_any_status_field() {
    let offer: OfferSummary =
      serde_json::from_value(json!({ "id": 1, "approvalStatus": "Approved" })).unwrap();
    assert!(offer.is_approved());
    let offer: OfferSummary = serde_json::from_value(json!({ "id": 2 })).unwrap();
    assert!(!offer.is_approved());
  }
}
