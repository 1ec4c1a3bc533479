//! Filesystem-level image artifact storage.
//!
//! Artifacts live in one flat directory under opaque, globally unique names
//! of the form `{prefix}_{epoch_millis}_{random_hex}.{ext}`. A file name is
//! the artifact's only identity.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use auditstore_common::paths::{
    extension_for_mime, extension_of, mime_for_extension, validate_file_name,
};
use auditstore_common::sanitize::sanitize_prefix;
use auditstore_common::{Error, IoContext, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use walkdir::WalkDir;

use super::decode::{decode_payload, DecodedImage};
use crate::config::{DEFAULT_MAX_IMAGE_BYTES, DEFAULT_UNIQUE_NAME_ATTEMPTS};
use crate::fsutil::{is_staging_name, write_first_free};

/// Prefix used when the caller supplies no namespace.
pub const DEFAULT_PREFIX: &str = "img";

/// Extension used when neither the original name nor the MIME type yields one.
const FALLBACK_EXTENSION: &str = "jpg";

/// Random bytes in each generated name (rendered as twice as many hex chars).
const RANDOM_SUFFIX_BYTES: usize = 8;

/// Metadata returned after storing an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Generated artifact file name.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type of the stored bytes.
    pub mime_type: String,
    /// When the artifact was written.
    pub created_at: DateTime<Utc>,
}

/// Filesystem metadata for an existing artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStat {
    pub file_name: String,
    pub size: u64,
    /// Derived from the extension; `None` for files outside the allow-list.
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Outcome of a best-effort batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub attempted: usize,
    /// Files removed, plus files that were already absent.
    pub deleted: usize,
    pub failed: Vec<DeleteFailure>,
}

/// A single failed deletion inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub file_name: String,
    pub error: String,
}

/// Flat-directory store for binary image artifacts.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
    max_attempts: usize,
}

impl ImageStore {
    /// Create a store over `dir` with default limits.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_attempts: DEFAULT_UNIQUE_NAME_ATTEMPTS,
        }
    }

    /// Override the decoded payload size limit.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Override the bound on name regeneration after collisions.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// The artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode and validate an inline payload against this store's limits.
    pub fn decode(&self, payload: &str) -> Result<DecodedImage> {
        decode_payload(payload, self.max_bytes)
    }

    /// Persist raw image bytes under a freshly generated name.
    ///
    /// The extension comes from `original_name` when it is an image
    /// extension. `namespace` groups artifacts by originating record; without
    /// one, [`DEFAULT_PREFIX`] is used.
    pub fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        namespace: Option<&str>,
    ) -> Result<StoredImage> {
        self.store_typed(bytes, original_name, namespace, None)
    }

    /// Decode an inline payload and persist it.
    pub fn store_payload(
        &self,
        payload: &str,
        original_name: &str,
        namespace: Option<&str>,
    ) -> Result<StoredImage> {
        let decoded = self.decode(payload)?;
        self.store_typed(
            &decoded.bytes,
            original_name,
            namespace,
            Some(&decoded.mime_type),
        )
    }

    fn store_typed(
        &self,
        bytes: &[u8],
        original_name: &str,
        namespace: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<StoredImage> {
        if bytes.is_empty() {
            return Err(Error::validation("image payload is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(Error::validation(format!(
                "image is {} bytes, exceeding the {} byte limit",
                bytes.len(),
                self.max_bytes
            )));
        }

        let ext = pick_extension(original_name, mime_type);
        let prefix = namespace
            .map(sanitize_prefix)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let candidates = (0..self.max_attempts).map(|_| generate_file_name(&prefix, &ext));
        let file_name = write_first_free(&self.dir, candidates, None, bytes, &prefix)?;

        let mime_type = mime_type
            .map(str::to_string)
            .or_else(|| mime_for_extension(&ext).map(str::to_string))
            .unwrap_or_default();

        tracing::debug!(
            file = %file_name,
            size = bytes.len(),
            mime = %mime_type,
            "stored image"
        );

        Ok(StoredImage {
            file_name,
            size: bytes.len() as u64,
            mime_type,
            created_at: Utc::now(),
        })
    }

    /// Filesystem path of an artifact. Does not check existence.
    pub fn path(&self, file_name: &str) -> Result<PathBuf> {
        validate_file_name(file_name)?;
        Ok(self.dir.join(file_name))
    }

    /// Size and timestamps of an artifact, or `None` if it does not exist.
    pub fn stat(&self, file_name: &str) -> Result<Option<ImageStat>> {
        let path = self.path(file_name)?;
        let meta = match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io("stat", path, e)),
        };

        let modified = meta.modified().io_context("stat", &path)?;
        let created = meta.created().unwrap_or(modified);

        Ok(Some(ImageStat {
            file_name: file_name.to_string(),
            size: meta.len(),
            mime_type: extension_of(file_name)
                .and_then(|ext| mime_for_extension(&ext))
                .map(str::to_string),
            created_at: DateTime::<Utc>::from(created),
            modified_at: DateTime::<Utc>::from(modified),
        }))
    }

    /// Read an artifact's bytes, or `None` if it does not exist.
    pub fn read(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(file_name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io("read", path, e)),
        }
    }

    /// Delete an artifact. Deleting an absent file succeeds.
    ///
    /// Returns whether a file was actually removed.
    pub fn delete(&self, file_name: &str) -> Result<bool> {
        let path = self.path(file_name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(file = %file_name, "deleted image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io("remove", path, e)),
        }
    }

    /// Delete several artifacts, recording failures instead of stopping.
    pub fn delete_many<I, S>(&self, file_names: I) -> DeleteReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = DeleteReport::default();
        for name in file_names {
            let name = name.as_ref();
            report.attempted += 1;
            match self.delete(name) {
                Ok(_) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "failed to delete image");
                    report.failed.push(DeleteFailure {
                        file_name: name.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Names of all stored artifacts, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.dir.clone());
                Error::io("list", path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_staging_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Stored artifacts that appear in none of the `referenced` names.
    ///
    /// Scans the whole directory; meant for maintenance runs.
    pub fn list_orphans<I, S>(&self, referenced: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let referenced: HashSet<String> = referenced
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| !referenced.contains(name))
            .collect())
    }
}

/// Extension for a stored artifact.
///
/// A decoded MIME type is authoritative: the original name's extension is
/// kept only when it maps to that same type, so `stat` reports what was
/// stored. Without a MIME type the original extension is used if it is an
/// image extension.
fn pick_extension(original_name: &str, mime_type: Option<&str>) -> String {
    let from_name = extension_of(original_name).filter(|ext| mime_for_extension(ext).is_some());

    match mime_type.and_then(extension_for_mime) {
        Some(canonical) => from_name
            .filter(|ext| mime_for_extension(ext) == mime_for_extension(canonical))
            .unwrap_or_else(|| canonical.to_string()),
        None => from_name.unwrap_or_else(|| FALLBACK_EXTENSION.to_string()),
    }
}

/// Format `{prefix}_{epoch_millis}_{random_hex}.{ext}`.
fn generate_file_name(prefix: &str, ext: &str) -> String {
    let mut random = [0u8; RANDOM_SUFFIX_BYTES];
    rand::thread_rng().fill_bytes(&mut random);
    format!(
        "{}_{}_{}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        hex::encode(random),
        ext
    )
}
