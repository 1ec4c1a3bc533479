//! Image artifact storage.
//!
//! Embedded image payloads arrive base64-encoded inside documents. This
//! module validates and decodes them, then keeps the bytes as standalone
//! artifacts in a flat directory that documents refer to by file name.

mod decode;
mod storage;

pub use decode::{decode_payload, DecodedImage, DEFAULT_MIME_TYPE};
pub use storage::{DeleteFailure, DeleteReport, ImageStat, ImageStore, StoredImage, DEFAULT_PREFIX};
