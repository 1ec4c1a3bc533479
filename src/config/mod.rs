mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config.storage);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./auditstore.toml",
        "~/.config/auditstore/config.toml",
        "/etc/auditstore/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {}", path.display());
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_paths(storage: &mut StorageConfig) {
    storage.root = expand(&storage.root);
    storage.templates_dir = storage.templates_dir.as_deref().map(expand);
    storage.images_dir = storage.images_dir.as_deref().map(expand);
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.storage.max_image_bytes == 0 {
        anyhow::bail!("storage.max_image_bytes cannot be 0");
    }

    if config.storage.unique_name_attempts == 0 {
        anyhow::bail!("storage.unique_name_attempts cannot be 0");
    }

    Ok(())
}
