//! A workflow document (§6): a file containing one or more workflows,
//! possibly with its own `defaults`, resolvable by inline/local/cross-repo
//! reference.

use serde::{Deserialize, Serialize};

use copier_types::{Defaults, Workflow};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub defaults: Option<Defaults>,
    #[serde(default)]
    pub source_repo: Option<String>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}
