//! Changed-file records from the host's PR-files query (§3 ChangedFile, §6).

use serde::{Deserialize, Serialize};

/// The status of a file within a merged pull request.
///
/// The host API reports these uppercase (`ADDED`, `MODIFIED`, `DELETED`,
/// `RENAMED`, `COPIED`, `CHANGED`) over GraphQL, but some REST-shaped
/// payloads use lowercase `removed` for deletions. Per §9's open question,
/// both are accepted and normalized here until a single ingest path is
/// chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Changed,
}

impl FileStatus {
    /// Parses a status string from either the GraphQL uppercase set or the
    /// lowercase `removed` variant.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ADDED" | "added" => Some(Self::Added),
            "MODIFIED" | "modified" => Some(Self::Modified),
            "DELETED" | "deleted" | "removed" | "REMOVED" => Some(Self::Deleted),
            "RENAMED" | "renamed" => Some(Self::Renamed),
            "COPIED" | "copied" => Some(Self::Copied),
            "CHANGED" | "changed" => Some(Self::Changed),
            _ => None,
        }
    }

    /// True for statuses that remove content from the source rather than
    /// adding or updating it.
    pub fn is_deletion(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// A single file changed by a merged pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
}
