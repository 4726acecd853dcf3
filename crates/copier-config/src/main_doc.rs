//! The main configuration document (§4.5, §6): either a legacy single
//! document with `copy_rules`, or a document with `workflow_configs[]`
//! entries referencing workflow documents.

use serde::{Deserialize, Serialize};

use copier_types::{CopyRule, Defaults, RepoRef, Workflow};

/// The root document as parsed before resolution. May carry legacy
/// `copy_rules`/`workflows` directly (already fully inline), or a list of
/// `workflow_configs` entries to fetch and expand.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MainDocument {
    #[serde(default)]
    pub source_repo: Option<RepoRef>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub batch_by_repo: bool,
    #[serde(default)]
    pub batch_pr_config: Option<copier_types::BatchPrConfig>,
    #[serde(default)]
    pub defaults: Option<Defaults>,
    #[serde(default)]
    pub copy_rules: Vec<CopyRule>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub workflow_configs: Vec<WorkflowConfigEntry>,
}

impl MainDocument {
    /// True when this document carries no legacy rules/workflows inline and
    /// no `workflow_configs` to resolve either.
    pub fn is_empty(&self) -> bool {
        self.copy_rules.is_empty() && self.workflows.is_empty() && self.workflow_configs.is_empty()
    }
}

/// How a `workflow_configs[i]` entry's workflow document is sourced (§4.5,
/// §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySourceKind {
    Inline,
    Local,
    Repo,
}

/// A single entry in the main document's `workflow_configs` list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfigEntry {
    pub source: EntrySourceKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Path to the workflow document, for `local`/`repo` sources.
    #[serde(default)]
    pub path: Option<String>,
    /// Target repository, for `repo` sources.
    #[serde(default)]
    pub repo: Option<RepoRef>,
    /// Target branch, for `repo` sources (defaults to `main`).
    #[serde(default)]
    pub branch: Option<String>,
    /// Inline workflows, for `inline` sources.
    #[serde(default)]
    pub workflows: Option<Vec<Workflow>>,
}

fn default_enabled() -> bool {
    true
}
