//! Common error type used throughout auditstore.
//!
//! Every storage operation reports one of three broad kinds of failure
//! (see [`ErrorKind`]): bad caller input, an absent file, or a storage-side
//! problem. The HTTP collaborator maps these to responses via
//! [`Error::http_status`].

use std::fmt;
use std::path::PathBuf;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller. Never retried.
    Validation,
    /// The named file does not exist.
    NotFound,
    /// Disk, permission, or on-disk format failure.
    Io,
}

/// Common error type for auditstore.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input was provided.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested file was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "template", "image").
        entity: String,
        /// The file name that was looked up.
        id: String,
    },

    /// A stored file exists but could not be parsed.
    #[error("Unreadable file {file}: {reason}")]
    Unreadable {
        /// The file name.
        file: String,
        /// Parser message.
        reason: String,
    },

    /// A bounded unique-name search ran out of candidates.
    #[error("Could not allocate a unique name for {base} after {attempts} attempts")]
    Exhausted {
        /// The base name that kept colliding.
        base: String,
        /// Number of candidates tried.
        attempts: usize,
    },

    /// An I/O operation failed.
    #[error("IO error during {op} on {}: {source}", path.display())]
    Io {
        /// The operation that failed (e.g. "write", "rename").
        op: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new Unreadable error.
    pub fn unreadable(file: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Unreadable {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap an I/O error with operation and path context.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Unreadable { .. } | Error::Exhausted { .. } | Error::Io { .. } => ErrorKind::Io,
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Unreadable { .. } => 500,
            Error::Exhausted { .. } => 503,
            Error::Io { .. } => 500,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Attach operation and path context to raw I/O results.
pub trait IoContext<T> {
    /// Convert an `io::Result` into [`Result`], recording `op` and `path`.
    fn io_context(self, op: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, op: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::io(op, path, source))
    }
}
