//! Audience id → display name resolution.
//!
//! Experiences and locations may target several audiences, but the view only
//! ever shows one name: the first id wins. This is a known simplification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{Audience, normalize_id};

pub const ALL_VISITORS: &str = "ALL VISITORS";
pub const AUDIENCE_NOT_FOUND: &str = "AUDIENCE NOT FOUND";

/// The audience an enriched option is shown to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceDetails {
  pub name: String,
  /// The first targeted audience id, or `null` for untargeted experiences.
  pub id:   Option<Value>,
}

impl AudienceDetails {
  pub fn all_visitors() -> Self {
    Self {
      name: ALL_VISITORS.to_owned(),
      id:   None,
    }
  }
}

/// Resolve `audience_ids` against the fetched audience collection.
pub fn resolve(audience_ids: &[Value], audiences: &[Audience]) -> AudienceDetails {
  let Some(first) = audience_ids.first() else {
    return AudienceDetails::all_visitors();
  };

  let wanted = normalize_id(first);
  let found = wanted.as_deref().and_then(|wanted| {
    audiences
      .iter()
      .find(|a| normalize_id(&a.id).as_deref() == Some(wanted))
  });

  let name = match found {
    Some(audience) => display_name(audience)
      .or(wanted)
      .unwrap_or_else(|| AUDIENCE_NOT_FOUND.to_owned()),
    None => AUDIENCE_NOT_FOUND.to_owned(),
  };

  AudienceDetails {
    name,
    id: Some(first.clone()),
  }
}

fn display_name(audience: &Audience) -> Option<String> {
  [audience.name.as_deref(), audience.kind.as_deref()]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|s| !s.is_empty())
    .map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn audiences() -> Vec<Audience> {
    serde_json::from_value(json!([
      { "id": 100, "name": "Returning visitors" },
      { "id": 200, "type": "reusable" },
      { "id": "300", "name": "  " , "type": "archived" },
      { "id": 400 }
    ]))
    .unwrap()
  }

  #[test]
  fn no_ids_means_all_visitors() {
    let details = resolve(&[], &audiences());
    assert_eq!(details, AudienceDetails::all_visitors());
    assert_eq!(details.id, None);
  }

  #[test]
  fn only_the_first_id_is_used() {
    let details = resolve(&[json!(100), json!(200)], &audiences());
    assert_eq!(details.name, "Returning visitors");
    assert_eq!(details.id, Some(json!(100)));
  }

  #[test]
  fn name_falls_back_to_type() {
    assert_eq!(resolve(&[json!(200)], &audiences()).name, "reusable");
    assert_eq!(resolve(&[json!(300)], &audiences()).name, "archived");
  }

  #[test]
  fn nameless_untyped_audience_falls_back_to_its_id() {
    let details = resolve(&[json!("400")], &audiences());
    assert_eq!(details.name, "400");
    assert_eq!(details.id, Some(json!("400")));
  }

  #[test]
  fn unknown_id_is_reported() {
    let details = resolve(&[json!(999)], &audiences());
    assert_eq!(details.name, AUDIENCE_NOT_FOUND);
    assert_eq!(details.id, Some(json!(999)));
  }
}
