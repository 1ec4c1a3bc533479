//! Document schema generations and checkpoint record traversal.
//!
//! Audit documents come in three shapes:
//!
//! - **Flat**: a list of checkpoint records.
//! - **Staged**: a list of stage groups, each holding its checkpoint records
//!   under `items` (or `checkpoints`).
//! - **Sectioned**: a list of sections, each holding stage groups under
//!   `stages`.
//!
//! The list is either the document itself or the first array found under
//! `stages`, `sections`, or `checkpoints`. The shape is resolved once per
//! traversal.

use serde_json::{Map, Value};

/// Keys that may hold the top-level list when the document is an object.
const ROOT_KEYS: &[&str] = &["stages", "sections", "checkpoints"];

/// Key under which a section holds its stage groups.
const STAGE_KEY: &str = "stages";

/// Keys under which a stage group holds its checkpoint records.
const GROUP_KEYS: &[&str] = &["items", "checkpoints"];

/// Which schema generation a document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// Checkpoint records directly in the top-level list.
    Flat,
    /// Checkpoint records nested inside stage groups.
    Staged,
    /// Stage groups nested inside sections.
    Sectioned,
}

impl DocumentShape {
    /// Resolve the shape of `document`.
    pub fn detect(document: &Value) -> Self {
        let Some((_, list)) = root_list(document) else {
            return DocumentShape::Flat;
        };
        if list.iter().any(has_stage_groups) {
            DocumentShape::Sectioned
        } else if list.iter().any(|entry| group_key(entry).is_some()) {
            DocumentShape::Staged
        } else {
            DocumentShape::Flat
        }
    }
}

/// A checkpoint record and its JSON pointer within the document.
pub(crate) type Record<'a> = (String, &'a Map<String, Value>);

/// Mutable counterpart of [`Record`].
pub(crate) type RecordMut<'a> = (String, &'a mut Map<String, Value>);

fn root_key(document: &Value) -> Option<&'static str> {
    if document.is_array() {
        return Some("");
    }
    ROOT_KEYS
        .iter()
        .copied()
        .find(|key| document.get(key).is_some_and(Value::is_array))
}

fn pointer_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("/{key}")
    }
}

fn root_list(document: &Value) -> Option<(String, &Vec<Value>)> {
    let key = root_key(document)?;
    let list = if key.is_empty() {
        document.as_array()?
    } else {
        document.get(key)?.as_array()?
    };
    Some((pointer_prefix(key), list))
}

fn root_list_mut(document: &mut Value) -> Option<(String, &mut Vec<Value>)> {
    let key = root_key(document)?;
    let list = if key.is_empty() {
        document.as_array_mut()?
    } else {
        document.get_mut(key)?.as_array_mut()?
    };
    Some((pointer_prefix(key), list))
}

fn group_key(entry: &Value) -> Option<&'static str> {
    GROUP_KEYS
        .iter()
        .copied()
        .find(|key| entry.get(key).is_some_and(Value::is_array))
}

/// Whether a section holds at least one stage group.
fn has_stage_groups(section: &Value) -> bool {
    section
        .get(STAGE_KEY)
        .and_then(Value::as_array)
        .is_some_and(|stages| stages.iter().any(|stage| group_key(stage).is_some()))
}

/// Every checkpoint record in `document`.
pub(crate) fn records(document: &Value) -> Vec<Record<'_>> {
    let shape = DocumentShape::detect(document);
    let Some((prefix, list)) = root_list(document) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (i, entry) in list.iter().enumerate() {
        let pointer = format!("{prefix}/{i}");
        match shape {
            DocumentShape::Flat => {
                if let Some(fields) = entry.as_object() {
                    out.push((pointer, fields));
                }
            }
            DocumentShape::Staged => push_group(entry, &pointer, &mut out),
            DocumentShape::Sectioned => match entry.get(STAGE_KEY).and_then(Value::as_array) {
                Some(stages) => {
                    for (j, stage) in stages.iter().enumerate() {
                        push_group(stage, &format!("{pointer}/{STAGE_KEY}/{j}"), &mut out);
                    }
                }
                // A section may hold its checkpoints without stage groups.
                None => push_group(entry, &pointer, &mut out),
            },
        }
    }
    out
}

fn push_group<'a>(group: &'a Value, pointer: &str, out: &mut Vec<Record<'a>>) {
    let Some(key) = group_key(group) else { return };
    let Some(items) = group.get(key).and_then(Value::as_array) else {
        return;
    };
    for (j, item) in items.iter().enumerate() {
        if let Some(fields) = item.as_object() {
            out.push((format!("{pointer}/{key}/{j}"), fields));
        }
    }
}

/// Every checkpoint record in `document`, mutably.
pub(crate) fn records_mut(document: &mut Value) -> Vec<RecordMut<'_>> {
    let shape = DocumentShape::detect(document);
    let Some((prefix, list)) = root_list_mut(document) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (i, entry) in list.iter_mut().enumerate() {
        let pointer = format!("{prefix}/{i}");
        match shape {
            DocumentShape::Flat => {
                if let Some(fields) = entry.as_object_mut() {
                    out.push((pointer, fields));
                }
            }
            DocumentShape::Staged => push_group_mut(entry, &pointer, &mut out),
            DocumentShape::Sectioned => {
                if entry.get(STAGE_KEY).is_some_and(Value::is_array) {
                    let Some(stages) = entry.get_mut(STAGE_KEY).and_then(Value::as_array_mut) else {
                        continue;
                    };
                    for (j, stage) in stages.iter_mut().enumerate() {
                        push_group_mut(stage, &format!("{pointer}/{STAGE_KEY}/{j}"), &mut out);
                    }
                } else {
                    push_group_mut(entry, &pointer, &mut out);
                }
            }
        }
    }
    out
}

fn push_group_mut<'a>(group: &'a mut Value, pointer: &str, out: &mut Vec<RecordMut<'a>>) {
    let Some(key) = group_key(group) else { return };
    let Some(items) = group.get_mut(key).and_then(Value::as_array_mut) else {
        return;
    };
    for (j, item) in items.iter_mut().enumerate() {
        if let Some(fields) = item.as_object_mut() {
            out.push((format!("{pointer}/{key}/{j}"), fields));
        }
    }
}

/// Escape a key for use as a JSON pointer segment.
pub(crate) fn pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
