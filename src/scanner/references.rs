//! Image reference extraction and orphan diffing.

use std::collections::BTreeSet;

use auditstore_common::paths::is_image_reference;
use serde_json::Value;

use super::shape::records;
use crate::images::{DeleteReport, ImageStore};

/// Image file names referenced by `document`'s checkpoint records.
///
/// A reference is a string field (or a string inside an array field) whose
/// value ends in an image extension.
pub fn extract_references(document: &Value) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for (_, fields) in records(document) {
        for value in fields.values() {
            match value {
                Value::String(s) => push_reference(&mut refs, s),
                Value::Array(items) => {
                    for item in items {
                        if let Value::String(s) = item {
                            push_reference(&mut refs, s);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    refs
}

fn push_reference(refs: &mut BTreeSet<String>, value: &str) {
    if is_image_reference(value) {
        refs.insert(value.trim().to_string());
    }
}

/// References present in `old` but gone from `new`.
///
/// A reference that only moved within the document is not removed.
pub fn diff_removed(old: &Value, new: &Value) -> BTreeSet<String> {
    let kept = extract_references(new);
    extract_references(old)
        .into_iter()
        .filter(|r| !kept.contains(r))
        .collect()
}

/// Union of the references of every document.
pub fn collect_references<'a, I>(documents: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Value>,
{
    documents
        .into_iter()
        .flat_map(extract_references)
        .collect()
}

/// Delete artifacts an edit dropped, except those still referenced elsewhere.
///
/// `still_referenced` holds the references of every other live document.
pub fn prune_removed(
    old: &Value,
    new: &Value,
    still_referenced: &BTreeSet<String>,
    store: &ImageStore,
) -> DeleteReport {
    let removed: Vec<String> = diff_removed(old, new)
        .into_iter()
        .filter(|r| !still_referenced.contains(r))
        .collect();
    if !removed.is_empty() {
        tracing::debug!(count = removed.len(), "pruning unreferenced images");
    }
    store.delete_many(&removed)
}
