//! On-disk template record format.

use chrono::{DateTime, Duration, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Caller-supplied template content, without storage timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDraft {
    #[serde(default)]
    pub template_code: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default)]
    pub header_config: Value,
    #[serde(default)]
    pub info_fields: Vec<Value>,
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub default_sections: Vec<Value>,
}

impl TemplateDraft {
    /// Draft with just a name and version set.
    pub fn named(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            template_name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }
}

/// A persisted template: draft content plus storage timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    #[serde(flatten)]
    pub draft: TemplateDraft,
    /// Set on first write, carried over unchanged afterwards.
    pub saved_at: DateTime<Utc>,
    /// Refreshed on every write; always later than the previous value.
    pub updated_at: DateTime<Utc>,
}

/// Timestamps carried over from the record being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stamps {
    pub saved_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&TemplateRecord> for Stamps {
    fn from(record: &TemplateRecord) -> Self {
        Self {
            saved_at: record.saved_at,
            updated_at: Some(record.updated_at),
        }
    }
}

impl Stamps {
    /// Timestamps from a record that fails the strict schema.
    ///
    /// `None` when the content is not JSON or has no usable `savedAt`.
    pub(crate) fn recover(content: &str) -> Option<Self> {
        let fields: SummaryFields = serde_json::from_str(content).ok()?;
        Some(Self {
            saved_at: fields.saved_at?,
            updated_at: fields.updated_at,
        })
    }
}

impl TemplateRecord {
    /// Build the record to write, given the stamps of the record it
    /// replaces (if any).
    pub(crate) fn stamp(draft: TemplateDraft, previous: Option<Stamps>) -> Self {
        let now = Utc::now();
        let saved_at = previous.map(|p| p.saved_at).unwrap_or(now);
        let updated_at = next_update_time(previous.and_then(|p| p.updated_at), now);
        Self {
            draft,
            saved_at,
            updated_at,
        }
    }
}

/// `now`, bumped past `previous` when the clock has not moved beyond it.
pub(crate) fn next_update_time(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

/// Listing entry for a template file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub file_name: String,
    pub template_name: String,
    pub version: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
    /// False when the file could not be parsed and the name was derived
    /// from the file name.
    pub readable: bool,
}

/// Lenient view used by listings; tolerates missing fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryFields {
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_timestamp")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Accept a string or a number (`"version": 2`); null reads as empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A malformed timestamp reads as absent rather than failing the listing.
fn lenient_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    })
}
