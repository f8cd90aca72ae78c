//! Directory listing synthesis.
//!
//! A listing is either a fixed literal set of children or derived from a
//! collection response. Responses come in two physical shapes, both
//! normalized to an ordered list of names:
//!
//! - an array of objects, each carrying its name at some JSON pointer
//!   (`/id`, `/metadata/name`, `/attributes/name`, ...);
//! - an object whose member names are the children.
//!
//! Names containing a separator are cut at the first one, so multi-segment
//! identifiers collapse to their leading segment. Every element yields one
//! entry; elements without a usable name are skipped.

use serde_json::Value;

use crate::vfs::SEPARATOR;

/// Where the child names live in a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `array` points at an array; each element's name is at `name`.
    ArrayOf {
        array: &'static str,
        name: &'static str,
    },
    /// `object` points at an object whose member names are the children.
    Members { object: &'static str },
}

/// How a directory gets its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingPlan {
    /// Hardcoded children; no network call.
    Static(&'static [&'static str]),
    /// GET the routed collection and extract names with the first shape
    /// whose container is present.
    Fetch(&'static [Shape]),
    /// Nothing to list.
    Empty,
}

/// Cut `name` at its first separator.
pub fn truncate_name(name: &str) -> &str {
    match name.find(SEPARATOR) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn extract(root: &Value, shape: Shape) -> Option<Vec<String>> {
    match shape {
        Shape::ArrayOf { array, name } => {
            let items = root.pointer(array)?.as_array()?;
            Some(
                items
                    .iter()
                    .filter_map(|item| item.pointer(name).and_then(name_of))
                    .collect(),
            )
        }
        Shape::Members { object } => {
            let members = root.pointer(object)?.as_object()?;
            Some(members.keys().cloned().collect())
        }
    }
}

/// Normalize raw names: truncate at the first separator, drop empties.
pub fn normalize<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| truncate_name(name.as_ref()).to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parse `raw` and extract child names using the first matching shape.
///
/// A body none of the shapes fit lists empty.
pub fn synthesize(raw: &[u8], shapes: &[Shape]) -> Result<Vec<String>, serde_json::Error> {
    let root: Value = serde_json::from_slice(raw)?;
    let names = shapes
        .iter()
        .find_map(|shape| extract(&root, *shape))
        .unwrap_or_default();
    Ok(normalize(names))
}

/// Children of a static plan.
pub fn static_names(names: &[&str]) -> Vec<String> {
    normalize(names.iter().copied())
}
