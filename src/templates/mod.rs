//! Versioned template records.
//!
//! A template describes the structure of an audit form. Records are stored
//! one per JSON file, named from the sanitized template name and version,
//! with numeric suffixes when two records would otherwise collide.

mod naming;
mod record;
mod store;

pub use naming::{candidate_names, generate_file_name, TEMPLATE_EXTENSION};
pub use record::{TemplateDraft, TemplateRecord, TemplateSummary};
pub use store::{SavedTemplate, TemplateStore, UpdatedTemplate};
