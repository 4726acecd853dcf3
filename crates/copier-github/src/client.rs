//! The narrow host-client boundary (§6, §9 "structured host clients").
//!
//! Everything the core needs from GitHub is expressed here, behind a trait,
//! so the pipeline and writer can run against [`crate::fake::FakeHostClient`]
//! in tests.

use async_trait::async_trait;
use copier_types::{ChangedFile, RepoRef};

use crate::error::HostError;

/// One blob entry for a Git tree (§4.7 step 2).
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// A created pull request.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// The result of a merge attempt (§4.7 step 6).
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub merged: bool,
    pub message: String,
}

/// The configured committer identity used as the Git commit author
/// (§4.7 step 4, §6 "Environment").
#[derive(Debug, Clone)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// The abstract host operations consumed by the core (§6).
#[async_trait]
pub trait HostClient: Send + Sync {
    /// `GET /repos/{owner}/{repo}/contents/{path}?ref={ref}`, base64-decoded.
    /// `None` if the path does not exist at `git_ref`.
    async fn get_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, HostError>;

    /// Paginated PR-files GraphQL query (§4.8 step 8, §6).
    async fn pr_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<ChangedFile>, HostError>;

    /// `GET /git/ref/heads/{branch}` → the branch's current commit SHA.
    async fn get_ref(&self, repo: &RepoRef, branch: &str) -> Result<String, HostError>;

    /// `POST /git/trees`.
    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> Result<String, HostError>;

    /// `POST /git/commits`.
    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        author: &CommitAuthor,
    ) -> Result<String, HostError>;

    /// `POST /git/refs` — create a new ref pointing at `sha`.
    async fn create_ref(&self, repo: &RepoRef, ref_name: &str, sha: &str) -> Result<(), HostError>;

    /// `PATCH /git/refs/heads/{branch}` — non-force update.
    async fn update_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        commit_sha: &str,
    ) -> Result<(), HostError>;

    /// `DELETE /git/refs/heads/{branch}`.
    async fn delete_ref(&self, repo: &RepoRef, branch: &str) -> Result<(), HostError>;

    /// `POST /repos/{o}/{r}/pulls`.
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest, HostError>;

    /// `PUT /repos/{o}/{r}/pulls/{n}/merge`, method = `merge`.
    async fn merge_pull_request(&self, repo: &RepoRef, number: u64) -> Result<MergeResult, HostError>;
}
