//! Staged writes: content is written to a temporary file in the target
//! directory, synced, then committed by rename (replace) or by a no-clobber
//! link (create). Readers never observe a partially written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use auditstore_common::{Error, IoContext, Result};
use tempfile::NamedTempFile;

/// Prefix of in-flight staging files. Listings skip dot-files.
pub const STAGING_PREFIX: &str = ".staging-";

/// Fully written content waiting to be committed under a final name.
#[derive(Debug)]
pub struct Staged {
    file: NamedTempFile,
    dir: PathBuf,
}

/// Outcome of a no-clobber commit.
#[derive(Debug)]
pub enum Commit {
    /// The content now lives at this path.
    Written(PathBuf),
    /// The name was taken; the staged content is handed back for another try.
    Taken(Staged),
}

impl Staged {
    /// Write `bytes` to a fresh staging file inside `dir`.
    pub fn new(dir: &Path, bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(dir)
            .io_context("create staging file", dir)?;
        file.write_all(bytes).io_context("write", file.path())?;
        file.as_file().sync_all().io_context("sync", file.path())?;
        Ok(Self {
            file,
            dir: dir.to_path_buf(),
        })
    }

    /// Commit over `name`, replacing any existing file.
    pub fn replace(self, name: &str) -> Result<PathBuf> {
        let target = self.dir.join(name);
        self.file
            .persist(&target)
            .map_err(|e| Error::io("rename", &target, e.error))?;
        Ok(target)
    }

    /// Commit as `name` only if nothing exists there yet.
    pub fn create(self, name: &str) -> Result<Commit> {
        let target = self.dir.join(name);
        match self.file.persist_noclobber(&target) {
            Ok(_) => Ok(Commit::Written(target)),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                Ok(Commit::Taken(Staged {
                    file: e.file,
                    dir: self.dir,
                }))
            }
            Err(e) => Err(Error::io("link", &target, e.error)),
        }
    }
}

/// Atomically write `bytes` to `dir/name`, replacing whatever is there.
pub fn write_replace(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    Staged::new(dir, bytes)?.replace(name)
}

/// Write `bytes` under the first candidate name that is free.
///
/// A candidate equal to `reuse` is overwritten instead of skipped. Existence
/// is re-checked at commit time, so a name taken by a concurrent writer after
/// the probe moves the search on to the next candidate. `base` names the
/// search in the exhaustion error.
pub fn write_first_free<I>(
    dir: &Path,
    candidates: I,
    reuse: Option<&str>,
    bytes: &[u8],
    base: &str,
) -> Result<String>
where
    I: IntoIterator<Item = String>,
{
    let mut staged = Staged::new(dir, bytes)?;
    let mut attempts = 0;

    for candidate in candidates {
        attempts += 1;
        if reuse == Some(candidate.as_str()) {
            staged.replace(&candidate)?;
            return Ok(candidate);
        }
        if dir.join(&candidate).exists() {
            continue;
        }
        match staged.create(&candidate)? {
            Commit::Written(_) => return Ok(candidate),
            Commit::Taken(back) => {
                tracing::debug!(candidate = %candidate, "name taken concurrently, retrying");
                staged = back;
            }
        }
    }

    Err(Error::Exhausted {
        base: base.to_string(),
        attempts,
    })
}

/// Whether a directory entry name is an in-flight staging file.
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with('.')
}
