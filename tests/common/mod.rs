//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which bootstraps storage roots in a temporary
//! directory and builds both stores over them.

#![allow(dead_code)]

use auditstore::images::ImageStore;
use auditstore::storage::{ensure_storage_roots, StorageRoots};
use auditstore::templates::TemplateStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tempfile::TempDir;

/// Temporary storage roots with stores attached.
pub struct TestHarness {
    pub dir: TempDir,
    pub roots: StorageRoots,
    pub templates: TemplateStore,
    pub images: ImageStore,
}

impl TestHarness {
    /// Create fresh, empty storage roots.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let roots = StorageRoots::under(dir.path());
        ensure_storage_roots(&roots).expect("failed to create storage roots");

        let templates = TemplateStore::new(&roots.templates);
        let images = ImageStore::new(&roots.images);

        Self {
            dir,
            roots,
            templates,
            images,
        }
    }

    /// Number of regular files directly in a directory.
    pub fn file_count(&self, dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .count()
    }
}

/// `data:` URI payload for the given MIME type and bytes.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
