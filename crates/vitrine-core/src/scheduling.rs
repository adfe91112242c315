//! Live / scheduled / expired classification.
//!
//! Always recomputed from `(now, starts_at, ends_at)`; never cached.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduling {
  Live,
  Scheduled,
  Expired,
}

/// Classify an activity window relative to `now`.
///
/// A missing start means the activity is already active, whatever its end.
pub fn classify(
  now: DateTime<Utc>,
  starts_at: Option<DateTime<Utc>>,
  ends_at: Option<DateTime<Utc>>,
) -> Scheduling {
  let Some(start) = starts_at else {
    return Scheduling::Live;
  };

  if now >= start && ends_at.is_none_or(|end| now <= end) {
    Scheduling::Live
  } else if ends_at.is_some_and(|end| now > end) {
    Scheduling::Expired
  } else {
    Scheduling::Scheduled
  }
}

/// ISO forms with an explicit offset (`Z`, `+0000`, `+00:00`), with or
/// without seconds.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];
/// ISO forms without an offset, read as local time.
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an upstream ISO timestamp.
///
/// Accepts RFC 3339, minute precision, compact offsets, offset-less
/// date-times (local time) and bare dates (UTC midnight). Placeholders such
/// as `"when activated"` and anything else unparseable yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Some(ts.with_timezone(&Utc));
  }
  if let Some(ts) = OFFSET_FORMATS
    .iter()
    .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
  {
    return Some(ts.with_timezone(&Utc));
  }
  if let Some(naive) = LOCAL_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
  {
    return Local
      .from_local_datetime(&naive)
      .earliest()
      .map(|ts| ts.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}
