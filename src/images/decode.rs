//! Inline image payload decoding and validation.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use auditstore_common::paths::{is_allowed_mime, normalize_mime};
use auditstore_common::{Error, Result};

/// MIME type assumed when a payload carries no `data:` prefix.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Standard alphabet, tolerant of missing padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A decoded payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// Normalized MIME type from the allow-list.
    pub mime_type: String,
}

/// Decode a base64 payload, optionally wrapped as a `data:` URI.
///
/// Checks run in a fixed order before anything touches the disk: the MIME
/// type must be on the allow-list, then the decoded length must not exceed
/// `max_bytes`. Malformed base64 is also a validation error.
pub fn decode_payload(payload: &str, max_bytes: usize) -> Result<DecodedImage> {
    let payload = payload.trim();
    let (mime_type, body) = split_data_uri(payload)?;

    if !is_allowed_mime(&mime_type) {
        return Err(Error::validation(format!(
            "unsupported image type: {mime_type}"
        )));
    }

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = PAYLOAD_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| Error::validation(format!("invalid base64 image payload: {e}")))?;

    if bytes.len() > max_bytes {
        return Err(Error::validation(format!(
            "image payload is {} bytes, exceeding the {} byte limit",
            bytes.len(),
            max_bytes
        )));
    }
    if bytes.is_empty() {
        return Err(Error::validation("image payload is empty"));
    }

    Ok(DecodedImage { bytes, mime_type })
}

/// Split `data:<mime>;base64,<body>` into its MIME type and body.
fn split_data_uri(payload: &str) -> Result<(String, &str)> {
    let Some(rest) = payload.strip_prefix("data:") else {
        return Ok((DEFAULT_MIME_TYPE.to_string(), payload));
    };

    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| Error::validation("data URI has no payload"))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(Error::validation("data URI payload must be base64 encoded"));
    }

    let mime = if mime.trim().is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        normalize_mime(mime)
    };
    Ok((mime, body))
}
