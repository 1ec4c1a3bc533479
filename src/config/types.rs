use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::storage::StorageRoots;

/// Default ceiling on decoded image payloads (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Default bound on the unique-name search.
pub const DEFAULT_UNIQUE_NAME_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Base directory; the per-store directories default to children of it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Template record directory (default: `<root>/templates`)
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    /// Flat image artifact directory (default: `<root>/images`)
    #[serde(default)]
    pub images_dir: Option<PathBuf>,

    /// Largest accepted decoded image payload, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// How many candidate names a unique-name search may try
    #[serde(default = "default_unique_name_attempts")]
    pub unique_name_attempts: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_unique_name_attempts() -> usize {
    DEFAULT_UNIQUE_NAME_ATTEMPTS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            templates_dir: None,
            images_dir: None,
            max_image_bytes: default_max_image_bytes(),
            unique_name_attempts: default_unique_name_attempts(),
        }
    }
}

impl StorageConfig {
    /// Resolve the configured directories into concrete storage roots.
    pub fn roots(&self) -> StorageRoots {
        let templates = self
            .templates_dir
            .clone()
            .unwrap_or_else(|| self.root.join("templates"));
        let images = self
            .images_dir
            .clone()
            .unwrap_or_else(|| self.root.join("images"));
        StorageRoots::new(templates, images)
    }
}
