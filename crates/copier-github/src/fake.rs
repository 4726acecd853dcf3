//! An in-memory [`HostClient`] double for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use copier_types::{ChangedFile, RepoRef};
use parking_lot::RwLock;

use crate::client::{CommitAuthor, HostClient, MergeResult, PullRequest, TreeEntry};
use crate::error::HostError;

#[derive(Default)]
struct RepoState {
    /// ref name -> commit sha
    refs: HashMap<String, String>,
    /// "{ref}:{path}" -> bytes
    contents: HashMap<String, Vec<u8>>,
    pr_files: HashMap<u64, Vec<ChangedFile>>,
    next_pr_number: u64,
    prs: HashMap<u64, PullRequest>,
    /// PR number -> body it was created with, for tests asserting on the
    /// PR-template merge order (§8 invariant 10).
    pr_bodies: HashMap<u64, String>,
    /// tree sha -> the blob entries it carries, so `update_ref` can apply
    /// them to the target branch the way a real ref-update makes a tree's
    /// content visible.
    pending_trees: HashMap<String, Vec<TreeEntry>>,
    /// commit sha -> tree sha, so `update_ref` knows which tree to apply.
    commits: HashMap<String, String>,
}

/// A fully in-memory [`HostClient`] for pipeline/writer tests. Trees and
/// commits are simulated as opaque counters; only ref state and blob
/// contents are tracked faithfully.
#[derive(Default)]
pub struct FakeHostClient {
    repos: RwLock<HashMap<String, RepoState>>,
    commit_counter: RwLock<u64>,
    fail_on: RwLock<Option<String>>,
}

impl FakeHostClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_ref(&self, repo: &RepoRef, branch: &str, sha: &str) {
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state.refs.insert(branch.to_string(), sha.to_string());
    }

    pub fn seed_content(&self, repo: &RepoRef, git_ref: &str, path: &str, bytes: &[u8]) {
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state
            .contents
            .insert(format!("{git_ref}:{path}"), bytes.to_vec());
    }

    pub fn seed_pr_files(&self, repo: &RepoRef, number: u64, files: Vec<ChangedFile>) {
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state.pr_files.insert(number, files);
    }

    /// Causes the next call whose URL-ish key contains `needle` to fail.
    pub fn fail_next(&self, needle: &str) {
        *self.fail_on.write() = Some(needle.to_string());
    }

    fn maybe_fail(&self, op: &str) -> Result<(), HostError> {
        let mut guard = self.fail_on.write();
        if let Some(needle) = guard.as_ref() {
            if op.contains(needle.as_str()) {
                *guard = None;
                return Err(HostError::new(op, "fake://host", "500", "injected failure"));
            }
        }
        Ok(())
    }

    pub fn committed_blob(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<Vec<u8>> {
        let repos = self.repos.read();
        let state = repos.get(&repo.as_key())?;
        state.contents.get(&format!("{branch}:{path}")).cloned()
    }

    pub fn branch_exists(&self, repo: &RepoRef, branch: &str) -> bool {
        self.repos
            .read()
            .get(&repo.as_key())
            .map(|s| s.refs.contains_key(branch))
            .unwrap_or(false)
    }

    pub fn pr_body(&self, repo: &RepoRef, number: u64) -> Option<String> {
        self.repos
            .read()
            .get(&repo.as_key())
            .and_then(|s| s.pr_bodies.get(&number).cloned())
    }
}

#[async_trait]
impl HostClient for FakeHostClient {
    async fn get_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, HostError> {
        self.maybe_fail("get_content")?;
        Ok(self
            .repos
            .read()
            .get(&repo.as_key())
            .and_then(|s| s.contents.get(&format!("{git_ref}:{path}")).cloned()))
    }

    async fn pr_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<ChangedFile>, HostError> {
        self.maybe_fail("pr_files")?;
        Ok(self
            .repos
            .read()
            .get(&repo.as_key())
            .and_then(|s| s.pr_files.get(&number).cloned())
            .unwrap_or_default())
    }

    async fn get_ref(&self, repo: &RepoRef, branch: &str) -> Result<String, HostError> {
        self.maybe_fail("get_ref")?;
        self.repos
            .read()
            .get(&repo.as_key())
            .and_then(|s| s.refs.get(branch).cloned())
            .ok_or_else(|| HostError::new("GET", "fake://ref", "404", "ref not found"))
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> Result<String, HostError> {
        self.maybe_fail("create_tree")?;
        let mut counter = self.commit_counter.write();
        *counter += 1;
        let tree_sha = format!("tree-{}-of-{base_tree_sha}", *counter);
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state.pending_trees.insert(tree_sha.clone(), entries.to_vec());
        Ok(tree_sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        _message: &str,
        tree_sha: &str,
        parent_sha: &str,
        _author: &CommitAuthor,
    ) -> Result<String, HostError> {
        self.maybe_fail("create_commit")?;
        let mut counter = self.commit_counter.write();
        *counter += 1;
        let sha = format!("commit-{}-{tree_sha}-{parent_sha}", *counter);
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state.commits.insert(sha.clone(), tree_sha.to_string());
        Ok(sha)
    }

    async fn create_ref(&self, repo: &RepoRef, ref_name: &str, sha: &str) -> Result<(), HostError> {
        self.maybe_fail("create_ref")?;
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        if state.refs.contains_key(ref_name) {
            return Err(HostError::new("POST", "fake://refs", "422", "ref already exists"));
        }
        state.refs.insert(ref_name.to_string(), sha.to_string());
        Ok(())
    }

    async fn update_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        commit_sha: &str,
    ) -> Result<(), HostError> {
        self.maybe_fail("update_ref")?;
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state.refs.insert(branch.to_string(), commit_sha.to_string());
        if let Some(tree_sha) = state.commits.get(commit_sha).cloned() {
            if let Some(entries) = state.pending_trees.get(&tree_sha).cloned() {
                for entry in entries {
                    state
                        .contents
                        .insert(format!("{branch}:{}", entry.path), entry.bytes);
                }
            }
        }
        Ok(())
    }

    async fn delete_ref(&self, repo: &RepoRef, branch: &str) -> Result<(), HostError> {
        self.maybe_fail("delete_ref")?;
        if branch == "main" {
            return Err(HostError::new("DELETE", "fake://refs", "403", "refusing to delete main"));
        }
        let mut repos = self.repos.write();
        if let Some(state) = repos.get_mut(&repo.as_key()) {
            state.refs.remove(branch);
        }
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
        _title: &str,
        body: &str,
    ) -> Result<PullRequest, HostError> {
        self.maybe_fail("create_pull_request")?;
        let mut repos = self.repos.write();
        let state = repos.entry(repo.as_key()).or_default();
        state.next_pr_number += 1;
        let number = state.next_pr_number;
        let pr = PullRequest {
            number,
            html_url: format!("https://github.com/{}/pull/{number}", repo.as_key()),
        };
        state.prs.insert(number, pr.clone());
        state.pr_bodies.insert(number, body.to_string());
        let _ = (head, base);
        Ok(pr)
    }

    async fn merge_pull_request(&self, repo: &RepoRef, number: u64) -> Result<MergeResult, HostError> {
        self.maybe_fail("merge_pull_request")?;
        let repos = self.repos.read();
        if repos
            .get(&repo.as_key())
            .and_then(|s| s.prs.get(&number))
            .is_none()
        {
            return Err(HostError::new("PUT", "fake://merge", "404", "pr not found"));
        }
        Ok(MergeResult {
            merged: true,
            message: "merged".to_string(),
        })
    }
}
