//! The deprecation manifest commit (§4.8 step 11, §8 invariant 7).

use std::collections::HashMap;

use copier_github::HostError;
use copier_types::{CommitStrategyType, ContentEntry, DeprecationEntry, RepoRef, UploadBatch};

use crate::writer::{WriteOutcome, Writer};

/// Loads the current manifest (if any), merges in the staged entries
/// deduplicated by `(repo, file_name)`, and commits the result. Returns
/// `None` without making any host call when nothing was staged (§8 invariant
/// 7: "if the set of staged deprecations is empty, zero write calls are made
/// to the deprecation manifest").
pub async fn flush_manifest(
    writer: &Writer,
    host: &dyn copier_github::HostClient,
    config_repo: &RepoRef,
    config_branch: &str,
    manifest_path: &str,
    staged: &HashMap<(String, String), DeprecationEntry>,
) -> Result<Option<String>, HostError> {
    if staged.is_empty() {
        return Ok(None);
    }

    let existing = host.get_content(config_repo, manifest_path, config_branch).await?;
    let mut by_key: HashMap<(String, String), DeprecationEntry> = match existing {
        Some(bytes) => serde_json::from_slice::<Vec<DeprecationEntry>>(&bytes)
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.key(), e))
            .collect(),
        None => HashMap::new(),
    };
    for entry in staged.values() {
        by_key.insert(entry.key(), entry.clone());
    }

    let mut merged: Vec<DeprecationEntry> = by_key.into_values().collect();
    merged.sort_by(|a, b| a.key().cmp(&b.key()));

    let bytes = serde_json::to_vec_pretty(&merged)
        .expect("DeprecationEntry serialization cannot fail");

    let file_names: Vec<&str> = staged.values().map(|e| e.file_name.as_str()).collect();
    let message = format!("Deprecate {}", file_names.join(", "));

    let batch = UploadBatch {
        target_branch: config_branch.to_string(),
        content: vec![ContentEntry {
            path: manifest_path.to_string(),
            bytes,
        }],
        commit_strategy: CommitStrategyType::Direct,
        commit_message: message,
        pr_title: String::new(),
        pr_body: String::new(),
        auto_merge: false,
        use_pr_template: false,
    };

    match writer.flush(config_repo, &batch).await? {
        WriteOutcome::Direct { commit_sha } => Ok(Some(commit_sha)),
        WriteOutcome::PullRequest { .. } => unreachable!("deprecation manifest is always a direct commit"),
    }
}
