//! Replacing embedded image payloads with stored artifact references.

use serde::Serialize;
use serde_json::{Map, Value};

use super::shape::{pointer_segment, records_mut};
use crate::images::ImageStore;

/// Original name recorded when a payload does not carry one.
const UNNAMED_IMAGE: &str = "image";

/// One payload that was stored and replaced by its file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Field key inside the checkpoint record.
    pub field: String,
    /// JSON pointer to the replaced value.
    pub pointer: String,
    pub file_name: String,
    pub original_name: String,
    pub size: u64,
}

/// One payload that could not be stored; its field was set to null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    pub field: String,
    pub pointer: String,
    pub error: String,
}

/// A document with its payloads swapped for references.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Materialized {
    pub document: Value,
    pub manifest: Vec<ManifestEntry>,
    pub failures: Vec<FieldFailure>,
}

/// Keys that may carry the inline base64 data, in priority order.
const DATA_KEYS: &[&str] = &["data", "base64"];

/// Keys that may carry the original file name, in priority order.
const NAME_KEYS: &[&str] = &["name", "originalName", "fileName"];

#[derive(Debug)]
struct EmbeddedImage {
    data: String,
    name: Option<String>,
}

impl EmbeddedImage {
    /// Interpret `value` as an inline payload.
    ///
    /// Needs a non-empty `data` string that is either a `data:` URI or comes
    /// with a name; other objects are ordinary field values. When several
    /// alias keys are present the first one in priority order wins.
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let data = first_string(fields, DATA_KEYS)?;
        let name = first_string(fields, NAME_KEYS);

        let looks_inline = data.trim_start().starts_with("data:") || name.is_some();
        (!data.trim().is_empty() && looks_inline).then(|| EmbeddedImage {
            data: data.to_string(),
            name: name.map(str::to_string),
        })
    }
}

fn first_string<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
}

/// Store every embedded payload in `document` and reference it by file name.
///
/// Each stored payload gets a manifest entry. A payload that fails to decode
/// or store leaves its field null and is reported in `failures`; the rest of
/// the document is still processed.
pub fn materialize_embedded_images(
    mut document: Value,
    store: &ImageStore,
    namespace: Option<&str>,
) -> Materialized {
    let mut manifest = Vec::new();
    let mut failures = Vec::new();

    for (record_pointer, fields) in records_mut(&mut document) {
        for (key, value) in fields.iter_mut() {
            let pointer = format!("{record_pointer}/{}", pointer_segment(key));
            let mut sink = Sink {
                store,
                namespace,
                field: key,
                manifest: &mut manifest,
                failures: &mut failures,
            };

            if let Value::Array(items) = value {
                for (idx, item) in items.iter_mut().enumerate() {
                    sink.replace(item, format!("{pointer}/{idx}"));
                }
            } else {
                sink.replace(value, pointer);
            }
        }
    }

    if !manifest.is_empty() || !failures.is_empty() {
        tracing::debug!(
            stored = manifest.len(),
            failed = failures.len(),
            "materialized embedded images"
        );
    }

    Materialized {
        document,
        manifest,
        failures,
    }
}

struct Sink<'a> {
    store: &'a ImageStore,
    namespace: Option<&'a str>,
    field: &'a str,
    manifest: &'a mut Vec<ManifestEntry>,
    failures: &'a mut Vec<FieldFailure>,
}

impl Sink<'_> {
    fn replace(&mut self, value: &mut Value, pointer: String) {
        let Some(embedded) = EmbeddedImage::from_value(value) else {
            return;
        };
        let original_name = embedded
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_IMAGE.to_string());

        match self
            .store
            .store_payload(&embedded.data, &original_name, self.namespace)
        {
            Ok(stored) => {
                *value = Value::String(stored.file_name.clone());
                self.manifest.push(ManifestEntry {
                    field: self.field.to_string(),
                    pointer,
                    file_name: stored.file_name,
                    original_name,
                    size: stored.size,
                });
            }
            Err(e) => {
                tracing::warn!(pointer = %pointer, error = %e, "dropping embedded image");
                *value = Value::Null;
                self.failures.push(FieldFailure {
                    field: self.field.to_string(),
                    pointer,
                    error: e.to_string(),
                });
            }
        }
    }
}
