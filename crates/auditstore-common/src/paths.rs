//! Path utilities: file-name validation and image type detection.
//!
//! Image references inside documents are plain strings, so detection works on
//! the extension alone. The MIME allow-list lives here so that decoding,
//! storing, and scanning agree on what counts as an image.

use std::path::Path;

use crate::error::{Error, Result};

/// Supported image file extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Allowed image MIME types paired with their canonical extension.
const ALLOWED_MIME_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Lowercased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check if a path has an image file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use auditstore_common::paths::is_image_file;
///
/// assert!(is_image_file(Path::new("weld_photo.JPG")));
/// assert!(!is_image_file(Path::new("report.pdf")));
/// ```
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check whether a document string value refers to a stored image.
pub fn is_image_reference(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && is_image_file(Path::new(value))
}

/// Whether `mime` is one of the accepted image types.
pub fn is_allowed_mime(mime: &str) -> bool {
    extension_for_mime(mime).is_some()
}

/// Canonical extension for an allowed MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = normalize_mime(mime);
    ALLOWED_MIME_TYPES
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
}

/// MIME type for an image extension, if it is on the allow-list.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg" } else { ext.as_str() };
    ALLOWED_MIME_TYPES
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(m, _)| *m)
}

/// Lowercase a MIME type and fold the common `image/jpg` misspelling.
pub fn normalize_mime(mime: &str) -> String {
    let mime = mime.trim().to_ascii_lowercase();
    if mime == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        mime
    }
}

/// Reject names that could address anything outside a flat storage directory.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("file name is required"));
    }
    if name == "." || name == ".." {
        return Err(Error::validation(format!("invalid file name: {name}")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::validation(format!(
            "file name must not contain path separators: {name}"
        )));
    }
    Ok(())
}
