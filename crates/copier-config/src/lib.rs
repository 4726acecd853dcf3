//! Layered configuration loading for file-copier (§4.5, L6).
//!
//! Reads a main document (legacy `copy_rules` or `workflow_configs[]`),
//! expands every `workflow_configs[i]` entry and `$ref` target, merges
//! `defaults` with the `auto_merge` non-inheritance carve-out, and validates
//! the result into a single [`copier_types::Config`].

pub mod defaults;
pub mod error;
pub mod loader;
pub mod main_doc;
pub mod refs;
pub mod validate;
pub mod workflow_doc;

pub use error::ConfigError;
pub use loader::Loader;
pub use main_doc::{EntrySourceKind, MainDocument, WorkflowConfigEntry};
pub use workflow_doc::WorkflowDocument;
