//! The File-State Store (§4.6, L4): two maps, staged for the duration of one
//! webhook and flushed by the writer.

use std::collections::HashMap;

use copier_types::{CommitStrategyType, DeprecationEntry, UploadBatch, UploadKey};

/// One file write staged for a given [`UploadKey`].
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: String,
    pub bytes: Vec<u8>,
    pub target_branch: String,
    pub commit_strategy: CommitStrategyType,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_body: String,
    pub auto_merge: bool,
    pub use_pr_template: bool,
}

/// Two staged maps private to a single webhook task (§5 "File-State Store is
/// private to a single webhook task; no cross-task sharing").
#[derive(Debug, Default)]
pub struct FileStateStore {
    uploads: HashMap<UploadKey, UploadBatch>,
    /// Keyed by manifest path, then by the `(repo, file_name)` dedup key
    /// (§3 DeprecationEntry, §8 invariant 7).
    deprecations: HashMap<String, HashMap<(String, String), DeprecationEntry>>,
}

impl FileStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one file write under `key` (§4.6). Appending to an existing
    /// key extends `content[]`. When `batch_by_repo` is `false`, message
    /// fields are re-rendered on every append — "last rule wins" within the
    /// key; when `true`, they are left as first-staged here and finalized in
    /// a single pass later (§4.8 step 10).
    pub fn add_upload(&mut self, key: UploadKey, staged: StagedUpload, batch_by_repo: bool) {
        let batch = self.uploads.entry(key).or_insert_with(|| UploadBatch {
            target_branch: staged.target_branch.clone(),
            content: Vec::new(),
            commit_strategy: staged.commit_strategy,
            commit_message: staged.commit_message.clone(),
            pr_title: staged.pr_title.clone(),
            pr_body: staged.pr_body.clone(),
            auto_merge: staged.auto_merge,
            use_pr_template: staged.use_pr_template,
        });
        batch.put(staged.path, staged.bytes);
        if !batch_by_repo {
            batch.commit_message = staged.commit_message;
            batch.pr_title = staged.pr_title;
            batch.pr_body = staged.pr_body;
            batch.auto_merge = staged.auto_merge;
            batch.use_pr_template = staged.use_pr_template;
        }
    }

    pub fn get_uploads(&self) -> &HashMap<UploadKey, UploadBatch> {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut HashMap<UploadKey, UploadBatch> {
        &mut self.uploads
    }

    pub fn clear_uploads(&mut self) {
        self.uploads.clear();
    }

    /// Stages a deprecation entry, deduplicated by `(repo, file_name)` within
    /// `manifest_path` (§3, §8 invariant 7).
    pub fn add_deprecation(&mut self, manifest_path: String, entry: DeprecationEntry) {
        self.deprecations
            .entry(manifest_path)
            .or_default()
            .insert(entry.key(), entry);
    }

    pub fn get_deprecations(&self) -> &HashMap<String, HashMap<(String, String), DeprecationEntry>> {
        &self.deprecations
    }

    pub fn clear_deprecations(&mut self) {
        self.deprecations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copier_types::RepoRef;
    use pretty_assertions::assert_eq;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".to_string(),
            name: "docs".to_string(),
        }
    }

    fn staged(path: &str, message: &str) -> StagedUpload {
        StagedUpload {
            path: path.to_string(),
            bytes: b"content".to_vec(),
            target_branch: "main".to_string(),
            commit_strategy: CommitStrategyType::Direct,
            commit_message: message.to_string(),
            pr_title: String::new(),
            pr_body: String::new(),
            auto_merge: false,
            use_pr_template: false,
        }
    }

    fn key(rule_name: Option<&str>) -> UploadKey {
        UploadKey {
            repo: repo(),
            branch_ref: "main".to_string(),
            strategy: CommitStrategyType::Direct,
            rule_name: rule_name.map(str::to_string),
        }
    }

    #[test]
    fn appending_same_key_extends_content() {
        let mut store = FileStateStore::new();
        store.add_upload(key(Some("r1")), staged("a.txt", "m1"), false);
        store.add_upload(key(Some("r1")), staged("b.txt", "m2"), false);
        let batch = &store.get_uploads()[&key(Some("r1"))];
        assert_eq!(batch.file_count(), 2);
    }

    #[test]
    fn last_rule_wins_when_not_batching_by_repo() {
        let mut store = FileStateStore::new();
        store.add_upload(key(None), staged("a.txt", "first message"), false);
        store.add_upload(key(None), staged("b.txt", "second message"), false);
        let batch = &store.get_uploads()[&key(None)];
        assert_eq!(batch.commit_message, "second message");
    }

    #[test]
    fn batch_by_repo_leaves_message_as_first_staged() {
        let mut store = FileStateStore::new();
        store.add_upload(key(None), staged("a.txt", "first message"), true);
        store.add_upload(key(None), staged("b.txt", "second message"), true);
        let batch = &store.get_uploads()[&key(None)];
        assert_eq!(batch.commit_message, "first message");
        assert_eq!(batch.file_count(), 2);
    }

    #[test]
    fn deprecations_dedup_by_repo_and_file_name() {
        use chrono::Utc;
        let mut store = FileStateStore::new();
        let entry = DeprecationEntry {
            file_name: "docs/a.txt".to_string(),
            repo: "acme/docs".to_string(),
            branch: "main".to_string(),
            deleted_on: Utc::now(),
        };
        store.add_deprecation("deprecated.json".to_string(), entry.clone());
        store.add_deprecation("deprecated.json".to_string(), entry);
        assert_eq!(store.get_deprecations()["deprecated.json"].len(), 1);
    }
}
