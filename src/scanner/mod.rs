//! Image references inside audit documents.
//!
//! Walks the checkpoint records of a document (either schema generation) to
//! find image references, store inline payloads as artifacts, and work out
//! which artifacts an edit left unreferenced.

mod materialize;
mod references;
mod shape;

pub use materialize::{materialize_embedded_images, FieldFailure, ManifestEntry, Materialized};
pub use references::{collect_references, diff_removed, extract_references, prune_removed};
pub use shape::DocumentShape;
