//! Common data model for file-copier: configuration, patterns, changed
//! files, and staged upload/deprecation records shared by every other
//! crate in the workspace.

pub mod changed_file;
pub mod config;
pub mod deprecation;
pub mod match_result;
pub mod repo_ref;
pub mod upload;
pub mod workflow;

pub use changed_file::{ChangedFile, FileStatus};
pub use config::{
    BatchPrConfig, CommitStrategyConfig, CommitStrategyType, Config, CopyRule, Defaults,
    DeprecationCheck, PatternType, SourcePattern, TargetConfig,
};
pub use deprecation::DeprecationEntry;
pub use match_result::MatchResult;
pub use repo_ref::{RepoRef, RepoRefError};
pub use upload::{ContentEntry, UploadBatch, UploadKey};
pub use workflow::{
    CommitStrategyField, DestinationRef, ExcludeField, RefSpec, SourceRef, Transformation,
    TransformationsField, Workflow,
};
