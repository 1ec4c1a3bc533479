//! Storage root layout and bootstrap.

use std::path::{Path, PathBuf};

use auditstore_common::{IoContext, Result};

/// Name of the backup directory nested inside the template directory.
pub const BACKUP_DIR_NAME: &str = "backups";

/// The directories the stores operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    /// Template record files.
    pub templates: PathBuf,
    /// Template backups, nested inside `templates`.
    pub template_backups: PathBuf,
    /// Flat image artifact directory.
    pub images: PathBuf,
}

impl StorageRoots {
    /// Build roots from a template directory and an image directory.
    pub fn new(templates: impl Into<PathBuf>, images: impl Into<PathBuf>) -> Self {
        let templates = templates.into();
        Self {
            template_backups: templates.join(BACKUP_DIR_NAME),
            templates,
            images: images.into(),
        }
    }

    /// Conventional layout under a single base directory.
    pub fn under(base: &Path) -> Self {
        Self::new(base.join("templates"), base.join("images"))
    }
}

/// Create every storage directory that does not exist yet.
///
/// Idempotent. Call once during process initialization.
pub fn ensure_storage_roots(roots: &StorageRoots) -> Result<()> {
    for dir in [&roots.templates, &roots.template_backups, &roots.images] {
        std::fs::create_dir_all(dir).io_context("create_dir_all", dir)?;
    }
    tracing::debug!(
        templates = %roots.templates.display(),
        images = %roots.images.display(),
        "storage roots ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_storage_roots_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let roots = StorageRoots::under(dir.path());

        ensure_storage_roots(&roots).unwrap();
        ensure_storage_roots(&roots).unwrap();

        assert!(roots.templates.is_dir());
        assert!(roots.template_backups.is_dir());
        assert!(roots.images.is_dir());
        assert_eq!(roots.template_backups, roots.templates.join("backups"));
    }
}
