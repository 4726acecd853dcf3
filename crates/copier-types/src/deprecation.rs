//! Deprecation manifest entries (§3 DeprecationEntry, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record of a file removed at its target path, persisted to the
/// configuration repository's deprecation manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    pub file_name: String,
    pub repo: String,
    pub branch: String,
    pub deleted_on: DateTime<Utc>,
}

impl DeprecationEntry {
    /// The staging/dedup key: `(repo, file_name)` per §3 and §8 invariant 7.
    pub fn key(&self) -> (String, String) {
        (self.repo.clone(), self.file_name.clone())
    }
}
