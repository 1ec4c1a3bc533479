//! Auditstore-Common: Shared types and utilities.
//!
//! This crate provides common functionality used across auditstore:
//!
//! - **Error Handling**: The storage error type, its kinds, and a result alias
//! - **Sanitizing**: The text-to-slug transform behind every generated file name
//! - **Path Utilities**: File-name validation and image type detection
//!
//! # Examples
//!
//! ```
//! use auditstore_common::{sanitize::sanitize_name, paths::is_image_reference, Error, Result};
//!
//! assert_eq!(sanitize_name("Traceability Report"), "Traceability_Report");
//! assert!(is_image_reference("1700000000000_ab12cd.png"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("template", "missing.json"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod paths;
pub mod sanitize;

pub use error::{Error, ErrorKind, IoContext, Result};
