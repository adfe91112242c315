//! Offer reference scanner.
//!
//! Walks an arbitrary activity payload depth-first, left to right in the
//! payload's own key order, looking for objects that point at an offer
//! (`offerId ?? id`, typed by `offerType ?? type`).
//!
//! Type policy:
//! - `"json"` is an exact match and is always collected;
//! - a missing type or `"content"` is provisional; the first one encountered
//!   is returned only when no exact match exists anywhere;
//! - any other explicit type (`"html"`, `"redirect"`, `"ab"`, ...) is ignored.
//!
//! The activity's own id is never reported. Matches are de-duplicated by id.
//!
//! The walk is generic over [`ScanNode`] so that graphs with shared or cyclic
//! nodes can be scanned too; container nodes are visited at most once, keyed
//! by identity rather than by value.

use std::collections::HashSet;

use serde_json::Value;

use crate::activity::{OfferReference, normalize_id};

const EXACT_TYPE: &str = "json";
const AMBIGUOUS_TYPE: &str = "content";

/// A node of a JSON-like tree or graph.
pub trait ScanNode: Sized {
  /// Stable identity of a container node (object or array). Scalars have
  /// none and are never tracked.
  fn identity(&self) -> Option<usize>;

  fn is_object(&self) -> bool;

  /// The normalised text of a scalar field on an object node.
  fn text_field(&self, key: &str) -> Option<String>;

  /// Child nodes in their natural order.
  fn children(&self) -> Vec<Self>;
}

impl<'a> ScanNode for &'a Value {
  fn identity(&self) -> Option<usize> {
    match *self {
      Value::Object(_) | Value::Array(_) => Some(std::ptr::from_ref::<Value>(*self) as usize),
      _ => None,
    }
  }

  fn is_object(&self) -> bool { (*self).is_object() }

  fn text_field(&self, key: &str) -> Option<String> { (*self).get(key).and_then(normalize_id) }

  fn children(&self) -> Vec<&'a Value> {
    match *self {
      Value::Object(map) => map.values().collect(),
      Value::Array(items) => items.iter().collect(),
      _ => Vec::new(),
    }
  }
}

enum Candidate {
  Exact(String),
  Provisional(String),
}

fn candidate<N: ScanNode>(node: &N, activity_id: &str) -> Option<Candidate> {
  let id = node
    .text_field("offerId")
    .or_else(|| node.text_field("id"))?;
  if id == activity_id {
    return None;
  }

  let kind = node
    .text_field("offerType")
    .or_else(|| node.text_field("type"))
    .map(|k| k.to_ascii_lowercase());

  match kind.as_deref() {
    Some(EXACT_TYPE) => Some(Candidate::Exact(id)),
    None | Some(AMBIGUOUS_TYPE) => Some(Candidate::Provisional(id)),
    Some(_) => None,
  }
}

/// Find offer references inside `root`, excluding `activity_id` itself.
///
/// Returns every exact (`"json"`) match in encounter order, or, if there are
/// none, the first provisional match. An empty result is not an error.
pub fn scan<N: ScanNode>(root: N, activity_id: &str) -> Vec<OfferReference> {
  let activity_id = activity_id.trim();
  let mut visited: HashSet<usize> = HashSet::new();
  let mut found: HashSet<String> = HashSet::new();
  let mut exact: Vec<OfferReference> = Vec::new();
  let mut provisional: Option<OfferReference> = None;

  // Explicit stack: pre-order, children pushed in reverse so the leftmost
  // child is visited first.
  let mut stack = vec![root];
  while let Some(node) = stack.pop() {
    if let Some(identity) = node.identity()
      && !visited.insert(identity)
    {
      continue;
    }

    if node.is_object() {
      match candidate(&node, activity_id) {
        Some(Candidate::Exact(id)) => {
          if found.insert(id.clone()) {
            exact.push(OfferReference::json(id));
          }
        }
        Some(Candidate::Provisional(id)) => {
          if provisional.is_none() {
            provisional = Some(OfferReference::json(id));
          }
        }
        None => {}
      }
    }

    let mut children = node.children();
    children.reverse();
    stack.extend(children);
  }

  if exact.is_empty() {
    provisional.into_iter().collect()
  } else {
    exact
  }
}

/// The single best reference: the first exact match, else the first
/// provisional one.
pub fn scan_best<N: ScanNode>(root: N, activity_id: &str) -> Option<OfferReference> {
  scan(root, activity_id).into_iter().next()
}
