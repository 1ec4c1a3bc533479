//! File-per-record template storage.
//!
//! Each template lives in `{templates_dir}/{name}_{version}[_{n}].json`.
//! Backups are plain copies under `{templates_dir}/backups/`.

use std::path::{Path, PathBuf};

use auditstore_common::paths::validate_file_name;
use auditstore_common::{Error, IoContext, Result};
use chrono::Utc;
use serde::Serialize;
use walkdir::WalkDir;

use super::naming::{
    backup_stem, candidate_names, generate_file_name, stem_of, template_stem, TEMPLATE_EXTENSION,
};
use super::record::{Stamps, SummaryFields, TemplateDraft, TemplateRecord, TemplateSummary};
use crate::config::DEFAULT_UNIQUE_NAME_ATTEMPTS;
use crate::fsutil::{is_staging_name, write_first_free, write_replace};
use crate::storage::BACKUP_DIR_NAME;

/// A record as written, with the file it landed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTemplate {
    pub file_name: String,
    pub record: TemplateRecord,
}

/// Result of [`TemplateStore::update`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedTemplate {
    pub file_name: String,
    pub record: TemplateRecord,
    /// Whether the record moved to a different file.
    pub renamed: bool,
}

/// What sits under a file name about to be rewritten.
enum Previous {
    Missing,
    Found(Option<Stamps>),
}

/// Versioned template records, one JSON file each.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    backup_dir: PathBuf,
    max_attempts: usize,
}

impl TemplateStore {
    /// Create a store over `dir`, with backups in `dir/backups`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            backup_dir: dir.join(BACKUP_DIR_NAME),
            dir,
            max_attempts: DEFAULT_UNIQUE_NAME_ATTEMPTS,
        }
    }

    /// Put backups somewhere other than the nested default.
    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    /// Override the unique-name attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// The template directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The backup directory.
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Deterministic file name for a name/version pair.
    pub fn generate_file_name(&self, name: &str, version: &str) -> Result<String> {
        generate_file_name(name, version)
    }

    /// First free file name for a name/version pair.
    ///
    /// The deterministic name is used when nothing occupies it or when it is
    /// `exclude` (the record being rewritten). Otherwise `_1`, `_2`, ... are
    /// tried up to the attempt ceiling. This only probes; writers re-check at
    /// commit time.
    pub fn allocate_unique_name(
        &self,
        name: &str,
        version: &str,
        exclude: Option<&str>,
    ) -> Result<String> {
        let stem = template_stem(name, version)?;
        for candidate in candidate_names(&stem, self.max_attempts) {
            if exclude == Some(candidate.as_str()) || !self.dir.join(&candidate).exists() {
                return Ok(candidate);
            }
        }
        Err(Error::Exhausted {
            base: stem,
            attempts: self.max_attempts,
        })
    }

    /// Save a template.
    ///
    /// With an `existing_file` that is present, the file is rewritten in place
    /// and keeps its original `savedAt`. Otherwise a new record is created
    /// under a unique name.
    pub fn save(&self, draft: TemplateDraft, existing_file: Option<&str>) -> Result<SavedTemplate> {
        let stem = template_stem(&draft.template_name, &draft.version)?;

        if let Some(existing) = existing_file {
            validate_file_name(existing)?;
            match self.previous(existing)? {
                Previous::Found(stamps) => return self.overwrite(existing, draft, stamps),
                Previous::Missing => {
                    tracing::debug!(file = %existing, "existing template not found, creating new");
                }
            }
        }

        let record = TemplateRecord::stamp(draft, None);
        let bytes = encode(&record)?;
        let file_name = write_first_free(
            &self.dir,
            candidate_names(&stem, self.max_attempts),
            None,
            &bytes,
            &stem,
        )?;

        tracing::info!(file = %file_name, "created template");
        Ok(SavedTemplate { file_name, record })
    }

    fn overwrite(
        &self,
        file_name: &str,
        draft: TemplateDraft,
        previous: Option<Stamps>,
    ) -> Result<SavedTemplate> {
        let record = TemplateRecord::stamp(draft, previous);
        write_replace(&self.dir, file_name, &encode(&record)?)?;
        tracing::debug!(file = %file_name, "rewrote template");
        Ok(SavedTemplate {
            file_name: file_name.to_string(),
            record,
        })
    }

    /// Read a template, or `None` if the file does not exist.
    pub fn read(&self, file_name: &str) -> Result<Option<TemplateRecord>> {
        validate_file_name(file_name)?;
        let path = self.dir.join(file_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io("read", path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::unreadable(file_name, e))
    }

    /// Timestamps of the record about to be replaced.
    ///
    /// A record that no longer matches the strict schema still hands over
    /// its `savedAt` when that field parses.
    fn previous(&self, file_name: &str) -> Result<Previous> {
        let path = self.dir.join(file_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Previous::Missing),
            Err(e) => return Err(Error::io("read", path, e)),
        };
        let stamps = Stamps::recover(&content);
        if stamps.is_none() {
            tracing::warn!(file = %file_name, "replacing template without a readable savedAt");
        }
        Ok(Previous::Found(stamps))
    }

    /// Rewrite a record under a new name and version.
    ///
    /// The record is committed at its new location before the old file is
    /// removed. If that removal fails, the new file is withdrawn again so the
    /// original stays the single copy. `savedAt` carries over from the old
    /// record.
    pub fn update(
        &self,
        old_file: &str,
        new_name: &str,
        new_version: &str,
        draft: TemplateDraft,
    ) -> Result<UpdatedTemplate> {
        self.update_with(old_file, new_name, new_version, draft, |path| {
            std::fs::remove_file(path)
        })
    }

    fn update_with<F>(
        &self,
        old_file: &str,
        new_name: &str,
        new_version: &str,
        mut draft: TemplateDraft,
        remove: F,
    ) -> Result<UpdatedTemplate>
    where
        F: FnOnce(&Path) -> std::io::Result<()>,
    {
        validate_file_name(old_file)?;
        let stem = template_stem(new_name, new_version)?;

        let previous = match self.previous(old_file)? {
            Previous::Found(stamps) => stamps,
            Previous::Missing => return Err(Error::not_found("template", old_file)),
        };

        draft.template_name = new_name.to_string();
        draft.version = new_version.to_string();
        let record = TemplateRecord::stamp(draft, previous);
        let bytes = encode(&record)?;

        let target = format!("{stem}{TEMPLATE_EXTENSION}");
        if target == old_file {
            write_replace(&self.dir, old_file, &bytes)?;
            return Ok(UpdatedTemplate {
                file_name: target,
                record,
                renamed: false,
            });
        }

        let file_name = write_first_free(
            &self.dir,
            candidate_names(&stem, self.max_attempts),
            Some(old_file),
            &bytes,
            &stem,
        )?;
        if file_name == old_file {
            return Ok(UpdatedTemplate {
                file_name,
                record,
                renamed: false,
            });
        }

        let old_path = self.dir.join(old_file);
        if let Err(e) = remove(&old_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                let new_path = self.dir.join(&file_name);
                if let Err(rollback) = std::fs::remove_file(&new_path) {
                    tracing::error!(
                        file = %file_name,
                        error = %rollback,
                        "failed to withdraw renamed template, both copies remain"
                    );
                }
                return Err(Error::io("remove", old_path, e));
            }
        }

        tracing::info!(from = %old_file, to = %file_name, "renamed template");
        Ok(UpdatedTemplate {
            file_name,
            record,
            renamed: true,
        })
    }

    /// Copy a template into the backup directory.
    ///
    /// Backups are named `{stem}_backup_{timestamp}.json`; a backup taken
    /// within the same millisecond gets a `_1`, `_2`, ... suffix instead of
    /// replacing the earlier one.
    pub fn backup(&self, file_name: &str) -> Result<String> {
        validate_file_name(file_name)?;
        let path = self.dir.join(file_name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found("template", file_name));
            }
            Err(e) => return Err(Error::io("read", path, e)),
        };

        std::fs::create_dir_all(&self.backup_dir).io_context("create_dir_all", &self.backup_dir)?;

        let stem = backup_stem(file_name, Utc::now());
        let backup_name = write_first_free(
            &self.backup_dir,
            candidate_names(&stem, self.max_attempts),
            None,
            &bytes,
            &stem,
        )?;

        tracing::info!(file = %file_name, backup = %backup_name, "backed up template");
        Ok(backup_name)
    }

    /// Summaries of every template file, sorted by file name.
    ///
    /// A file that fails to parse is still listed, under a name derived from
    /// its file name.
    pub fn list(&self) -> Result<Vec<TemplateSummary>> {
        let mut summaries: Vec<TemplateSummary> = json_files(&self.dir)?
            .into_iter()
            .map(|file_name| self.summarize(file_name))
            .collect();
        summaries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(summaries)
    }

    fn summarize(&self, file_name: String) -> TemplateSummary {
        let parsed = std::fs::read_to_string(self.dir.join(&file_name))
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<SummaryFields>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(fields) => TemplateSummary {
                template_name: fields
                    .template_name
                    .unwrap_or_else(|| name_from_file(&file_name)),
                version: fields.version,
                saved_at: fields.saved_at,
                readable: true,
                file_name,
            },
            Err(reason) => {
                tracing::warn!(file = %file_name, %reason, "listing unreadable template");
                TemplateSummary {
                    template_name: name_from_file(&file_name),
                    version: None,
                    saved_at: None,
                    readable: false,
                    file_name,
                }
            }
        }
    }

    /// Delete a template record.
    pub fn delete(&self, file_name: &str) -> Result<()> {
        validate_file_name(file_name)?;
        let path = self.dir.join(file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(file = %file_name, "deleted template");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("template", file_name))
            }
            Err(e) => Err(Error::io("remove", path, e)),
        }
    }

    /// Backup file names, sorted.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = json_files(&self.backup_dir)?;
        names.sort();
        Ok(names)
    }
}

fn encode(record: &TemplateRecord) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(record)
        .map_err(|e| Error::validation(format!("template cannot be serialized: {e}")))
}

/// `.json` files directly inside `dir`, skipping staging files.
fn json_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            Error::io("list", path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_staging_name(&name) && name.ends_with(TEMPLATE_EXTENSION) {
            names.push(name);
        }
    }
    Ok(names)
}

fn name_from_file(file_name: &str) -> String {
    stem_of(file_name).replace('_', " ")
}
