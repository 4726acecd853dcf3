//! The PR pipeline core: File-State Store, Target Writer, matching/staging
//! for both configuration formats, the deprecation-manifest commit, and the
//! top-level webhook orchestrator (§4.6-§4.9, L4/L7/L8/L9).

pub mod deprecation;
pub mod error;
pub mod legacy_pipeline;
pub mod metrics;
pub mod store;
pub mod webhook;
pub mod workflow_pipeline;
pub mod writer;

pub use error::PipelineError;
pub use metrics::{AuditEvent, AuditOutcome, RunMetrics};
pub use store::{FileStateStore, StagedUpload};
pub use webhook::{process, process_with_deadline, WebhookContext};
pub use writer::{WriteOutcome, Writer};
