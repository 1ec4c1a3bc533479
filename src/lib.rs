//! Auditstore - artifact storage for manufacturing audit reports
//!
//! This library crate exposes the storage core: versioned template records,
//! image artifacts, and the document scanner that links the two.

pub mod config;
pub mod fsutil;
pub mod images;
pub mod scanner;
pub mod storage;
pub mod templates;

pub use auditstore_common::{Error, ErrorKind, Result};
