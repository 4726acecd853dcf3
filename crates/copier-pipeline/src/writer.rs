//! The Target Writer (§4.7, L7): direct-branch commits and the temp-branch
//! PR flow, both built from the same tree/commit primitives.

use std::sync::Arc;

use chrono::Utc;
use copier_github::{CommitAuthor, HostClient, HostError, TreeEntry};
use copier_types::{CommitStrategyType, RepoRef, UploadBatch};

const PR_TEMPLATE_CANDIDATES: &[&str] = &[
    ".github/pull_request_template.md",
    ".github/PULL_REQUEST_TEMPLATE.md",
    "docs/pull_request_template.md",
    "PULL_REQUEST_TEMPLATE.md",
    "pull_request_template.md",
];

/// What a flush produced, for metrics/audit purposes.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Direct { commit_sha: String },
    PullRequest { number: u64, merged: bool },
}

/// Flushes [`UploadBatch`]es to a [`HostClient`] (§4.7).
///
/// One `Writer` instance is shared across all batches in a webhook; it holds
/// no per-batch state, so batches can be flushed in any order (§5 "The write
/// phase processes UploadBatches in unspecified order").
pub struct Writer {
    host: Arc<dyn HostClient>,
    committer: CommitAuthor,
}

impl Writer {
    pub fn new(host: Arc<dyn HostClient>, committer: CommitAuthor) -> Self {
        Self { host, committer }
    }

    /// Flushes one batch per its own `commit_strategy`. On failure, the
    /// error is returned to the caller, which moves on to the next batch
    /// (§4.7 "any failure aborts subsequent steps for this batch but the
    /// writer continues with the next batch").
    pub async fn flush(&self, repo: &RepoRef, batch: &UploadBatch) -> Result<WriteOutcome, HostError> {
        match batch.commit_strategy {
            CommitStrategyType::Direct => {
                let commit_sha = self.direct_commit(repo, &batch.target_branch, batch).await?;
                Ok(WriteOutcome::Direct { commit_sha })
            }
            CommitStrategyType::PullRequest => self.pull_request_flow(repo, batch).await,
        }
    }

    /// Steps 1-5 of §4.7's direct-commit strategy: ref read, tree, commit,
    /// ref-update.
    async fn direct_commit(
        &self,
        repo: &RepoRef,
        branch: &str,
        batch: &UploadBatch,
    ) -> Result<String, HostError> {
        let base_sha = self.host.get_ref(repo, branch).await?;
        let commit_sha = self.commit_tree(repo, &base_sha, batch).await?;
        self.host.update_ref(repo, branch, &commit_sha).await?;
        Ok(commit_sha)
    }

    async fn commit_tree(
        &self,
        repo: &RepoRef,
        base_sha: &str,
        batch: &UploadBatch,
    ) -> Result<String, HostError> {
        let entries: Vec<TreeEntry> = batch
            .content
            .iter()
            .map(|entry| TreeEntry {
                path: entry.path.clone(),
                bytes: entry.bytes.clone(),
            })
            .collect();
        let tree_sha = self.host.create_tree(repo, base_sha, &entries).await?;
        self.host
            .create_commit(repo, &batch.commit_message, &tree_sha, base_sha, &self.committer)
            .await
    }

    /// The PR strategy's state machine (§4.7 "State machine for the PR
    /// path"): `Init -> BaseRefRead -> TempBranchCreated -> FilesCommitted ->
    /// PRCreated -> (PRMerged|PROpen) -> TempBranchDeleted`.
    async fn pull_request_flow(
        &self,
        repo: &RepoRef,
        batch: &UploadBatch,
    ) -> Result<WriteOutcome, HostError> {
        let base_sha = self.host.get_ref(repo, &batch.target_branch).await?;
        tracing::debug!(repo = %repo, branch = %batch.target_branch, "BaseRefRead");

        let temp_branch = format!("copier/{}", Utc::now().format("%Y%m%d-%H%M%S"));
        if self.host.get_ref(repo, &temp_branch).await.is_ok() {
            if let Err(err) = self.host.delete_ref(repo, &temp_branch).await {
                tracing::warn!(repo = %repo, branch = %temp_branch, error = %err, "temp branch collision, delete failed");
            }
        }
        self.host.create_ref(repo, &temp_branch, &base_sha).await?;
        tracing::debug!(repo = %repo, branch = %temp_branch, "TempBranchCreated");

        let commit_sha = self.commit_tree(repo, &base_sha, batch).await?;
        self.host.update_ref(repo, &temp_branch, &commit_sha).await?;
        tracing::debug!(repo = %repo, commit = %commit_sha, "FilesCommitted");

        let body = if batch.use_pr_template {
            match self.fetch_pr_template(repo, &batch.target_branch).await {
                Some(template) => format!("{template}\n\n---\n\n{}", batch.pr_body),
                None => batch.pr_body.clone(),
            }
        } else {
            batch.pr_body.clone()
        };

        let pr_result = self
            .host
            .create_pull_request(repo, &temp_branch, &batch.target_branch, &batch.pr_title, &body)
            .await;
        let pr = match pr_result {
            Ok(pr) => pr,
            Err(err) => {
                self.delete_temp_branch(repo, &temp_branch).await;
                return Err(err);
            }
        };
        tracing::debug!(repo = %repo, pr_number = pr.number, "PRCreated");

        let merged = if batch.auto_merge {
            match self.host.merge_pull_request(repo, pr.number).await {
                Ok(result) => {
                    tracing::debug!(repo = %repo, pr_number = pr.number, "PRMerged");
                    result.merged
                }
                Err(err) => {
                    self.delete_temp_branch(repo, &temp_branch).await;
                    return Err(err);
                }
            }
        } else {
            tracing::debug!(repo = %repo, pr_number = pr.number, "PROpen");
            false
        };

        self.delete_temp_branch(repo, &temp_branch).await;
        Ok(WriteOutcome::PullRequest {
            number: pr.number,
            merged,
        })
    }

    /// Step 7: attempted always, failures are logged but non-fatal.
    async fn delete_temp_branch(&self, repo: &RepoRef, temp_branch: &str) {
        if let Err(err) = self.host.delete_ref(repo, temp_branch).await {
            tracing::warn!(repo = %repo, branch = %temp_branch, error = %err, "failed to delete temp branch");
        } else {
            tracing::debug!(repo = %repo, branch = %temp_branch, "TempBranchDeleted");
        }
    }

    /// Checks the PR-template candidate paths in order against `branch`;
    /// the first present file wins (§4.7 step 4).
    async fn fetch_pr_template(&self, repo: &RepoRef, branch: &str) -> Option<String> {
        for path in PR_TEMPLATE_CANDIDATES {
            match self.host.get_content(repo, path, branch).await {
                Ok(Some(bytes)) => return String::from_utf8(bytes).ok(),
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(repo = %repo, path, error = %err, "error fetching PR template candidate");
                    continue;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copier_github::FakeHostClient;
    use copier_types::ContentEntry;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".to_string(),
            name: "t".to_string(),
        }
    }

    fn committer() -> CommitAuthor {
        CommitAuthor {
            name: "file-copier".to_string(),
            email: "copier@example.com".to_string(),
        }
    }

    fn batch(strategy: CommitStrategyType) -> UploadBatch {
        UploadBatch {
            target_branch: "main".to_string(),
            content: vec![ContentEntry {
                path: "docs/a.go".to_string(),
                bytes: b"package a".to_vec(),
            }],
            commit_strategy: strategy,
            commit_message: "Update code examples".to_string(),
            pr_title: "Sync files".to_string(),
            pr_body: "body".to_string(),
            auto_merge: false,
            use_pr_template: false,
        }
    }

    #[tokio::test]
    async fn direct_commit_writes_content_to_branch() {
        let fake = Arc::new(FakeHostClient::new());
        fake.seed_ref(&repo(), "main", "base-sha");
        let writer = Writer::new(fake.clone(), committer());
        let outcome = writer.flush(&repo(), &batch(CommitStrategyType::Direct)).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Direct { .. }));
        assert_eq!(
            fake.committed_blob(&repo(), "main", "docs/a.go"),
            Some(b"package a".to_vec())
        );
    }

    #[tokio::test]
    async fn pull_request_flow_creates_and_deletes_temp_branch() {
        let fake = Arc::new(FakeHostClient::new());
        fake.seed_ref(&repo(), "main", "base-sha");
        let writer = Writer::new(fake.clone(), committer());
        let outcome = writer
            .flush(&repo(), &batch(CommitStrategyType::PullRequest))
            .await
            .unwrap();
        match outcome {
            WriteOutcome::PullRequest { merged, .. } => assert!(!merged),
            _ => panic!("expected PullRequest outcome"),
        }
    }

    #[tokio::test]
    async fn pull_request_flow_auto_merges_when_configured() {
        let fake = Arc::new(FakeHostClient::new());
        fake.seed_ref(&repo(), "main", "base-sha");
        let writer = Writer::new(fake.clone(), committer());
        let mut b = batch(CommitStrategyType::PullRequest);
        b.auto_merge = true;
        let outcome = writer.flush(&repo(), &b).await.unwrap();
        match outcome {
            WriteOutcome::PullRequest { merged, .. } => assert!(merged),
            _ => panic!("expected PullRequest outcome"),
        }
    }

    #[tokio::test]
    async fn pr_template_is_prepended_before_configured_body() {
        let fake = Arc::new(FakeHostClient::new());
        fake.seed_ref(&repo(), "main", "base-sha");
        fake.seed_content(&repo(), "main", ".github/pull_request_template.md", b"Checklist");
        let writer = Writer::new(fake.clone(), committer());
        let mut b = batch(CommitStrategyType::PullRequest);
        b.use_pr_template = true;
        b.pr_body = "Sync 2 py files".to_string();
        let outcome = writer.flush(&repo(), &b).await.unwrap();
        let number = match outcome {
            WriteOutcome::PullRequest { number, .. } => number,
            _ => panic!("expected PullRequest outcome"),
        };
        assert_eq!(
            fake.pr_body(&repo(), number),
            Some("Checklist\n\n---\n\nSync 2 py files".to_string())
        );
    }
}
