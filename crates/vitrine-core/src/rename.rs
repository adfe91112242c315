//! Date-suffix renaming of offer content.
//!
//! Offer content carries a campaign name at `payload.nomeOferta` ending in a
//! `-YYYYMMDD` date. Renaming replaces that suffix (never appends a second
//! one), so applying the same date twice is a no-op.

use chrono::NaiveDate;
use serde_json::Value;

/// Result of [`rename`]. `content` keeps the representation of the input:
/// a JSON-encoded string stays a string, an object stays an object.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameOutcome {
  pub content: Value,
  pub changed: bool,
}

impl RenameOutcome {
  fn unchanged(content: &Value) -> Self {
    Self {
      content: content.clone(),
      changed: false,
    }
  }
}

/// `YYYYMMDD` for `date`.
pub fn date_suffix(date: NaiveDate) -> String { date.format("%Y%m%d").to_string() }

/// Rewrite `payload.nomeOferta` inside `content` with `date_suffix`.
///
/// Content without that field, non-JSON strings and non-object values are
/// returned unchanged.
pub fn rename(content: &Value, date_suffix: &str) -> RenameOutcome {
  match content {
    Value::String(raw) => {
      let mut parsed: Value = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
          tracing::warn!(error = %e, "offer content is not valid JSON, leaving it unchanged");
          return RenameOutcome::unchanged(content);
        }
      };
      if !rename_in_place(&mut parsed, date_suffix) {
        return RenameOutcome::unchanged(content);
      }
      match serde_json::to_string(&parsed) {
        Ok(encoded) => RenameOutcome {
          content: Value::String(encoded),
          changed: true,
        },
        Err(e) => {
          tracing::warn!(error = %e, "failed to re-encode offer content");
          RenameOutcome::unchanged(content)
        }
      }
    }
    Value::Object(_) => {
      let mut renamed = content.clone();
      let changed = rename_in_place(&mut renamed, date_suffix);
      RenameOutcome {
        content: renamed,
        changed,
      }
    }
    _ => RenameOutcome::unchanged(content),
  }
}

fn rename_in_place(doc: &mut Value, date_suffix: &str) -> bool {
  let Some(slot) = doc
    .get_mut("payload")
    .and_then(|payload| payload.get_mut("nomeOferta"))
  else {
    return false;
  };
  let Some(current) = slot.as_str() else {
    return false;
  };

  let next = with_date_suffix(current, date_suffix);
  if next == current {
    return false;
  }
  *slot = Value::String(next);
  true
}

/// `name` with any trailing `-YYYYMMDD` suffixes and dashes removed and
/// `-{date_suffix}` appended.
pub fn with_date_suffix(name: &str, date_suffix: &str) -> String {
  format!("{}-{date_suffix}", strip_date_suffix(name))
}

fn strip_date_suffix(mut name: &str) -> &str {
  loop {
    name = name.trim_end_matches('-');
    let bytes = name.as_bytes();
    let n = bytes.len();
    let dated = n >= 9
      && bytes[n - 9] == b'-'
      && bytes[n - 8..].iter().all(u8::is_ascii_digit);
    if !dated {
      return name;
    }
    name = &name[..n - 9];
  }
}
