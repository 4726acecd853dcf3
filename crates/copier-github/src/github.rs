//! The real [`HostClient`] implementation, talking to the GitHub REST and
//! GraphQL APIs over `reqwest` (§6).

use async_trait::async_trait;
use base64::Engine;
use copier_types::{ChangedFile, FileStatus, RepoRef};
use serde::Deserialize;
use serde_json::json;

use crate::client::{CommitAuthor, HostClient, MergeResult, PullRequest, TreeEntry};
use crate::error::HostError;

const API_BASE: &str = "https://api.github.com";
const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// A host client bound to one installation access token, scoped to the
/// lifetime of a single webhook's processing (§5).
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, token: String) -> Self {
        Self { http, token }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("User-Agent", "file-copier")
            .header("Accept", "application/vnd.github+json")
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<(reqwest::StatusCode, serde_json::Value), HostError> {
        let response = builder
            .send()
            .await
            .map_err(|err| HostError::transport(method, url, &err))?;
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        Ok((status, body))
    }

    /// `POST /git/blobs` with base64 content, so tree entries can carry
    /// arbitrary (including binary) bytes rather than UTF-8-lossy text.
    async fn create_blob(&self, repo: &RepoRef, bytes: &[u8]) -> Result<String, HostError> {
        let url = format!("{API_BASE}/repos/{}/{}/git/blobs", repo.owner, repo.name);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let (status, body) = self
            .send(
                "POST",
                &url,
                self.authed(self.http.post(&url)).json(&json!({
                    "content": encoded,
                    "encoding": "base64",
                })),
            )
            .await?;
        Self::check_ok("POST", &url, status, &body)?;
        body.get("sha")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| HostError::new("POST", &url, status, "missing blob sha"))
    }

    fn check_ok(
        method: &str,
        url: &str,
        status: reqwest::StatusCode,
        body: &serde_json::Value,
    ) -> Result<(), HostError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(HostError::new(method, url, status, body.to_string()))
        }
    }
}

#[async_trait]
impl HostClient for GithubClient {
    async fn get_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, HostError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/contents/{path}?ref={git_ref}",
            repo.owner, repo.name
        );
        let (status, body) = self.send("GET", &url, self.authed(self.http.get(&url))).await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check_ok("GET", &url, status, &body)?;

        let encoded = body
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HostError::new("GET", &url, status, "missing content field"))?;
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|err| HostError::new("GET", &url, status, err.to_string()))?;
        Ok(Some(bytes))
    }

    async fn pr_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<ChangedFile>, HostError> {
        #[derive(Deserialize)]
        struct GqlResponse {
            data: Option<GqlData>,
        }
        #[derive(Deserialize)]
        struct GqlData {
            repository: Option<GqlRepo>,
        }
        #[derive(Deserialize)]
        struct GqlRepo {
            #[serde(rename = "pullRequest")]
            pull_request: Option<GqlPr>,
        }
        #[derive(Deserialize)]
        struct GqlPr {
            files: GqlFiles,
        }
        #[derive(Deserialize)]
        struct GqlFiles {
            edges: Vec<GqlEdge>,
            #[serde(rename = "pageInfo")]
            page_info: GqlPageInfo,
        }
        #[derive(Deserialize)]
        struct GqlEdge {
            node: GqlNode,
        }
        #[derive(Deserialize)]
        struct GqlNode {
            path: String,
            additions: u32,
            deletions: u32,
            #[serde(rename = "changeType")]
            change_type: String,
        }
        #[derive(Deserialize)]
        struct GqlPageInfo {
            #[serde(rename = "hasNextPage")]
            has_next_page: bool,
            #[serde(rename = "endCursor")]
            end_cursor: Option<String>,
        }

        const QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      files(first: 100, after: $cursor) {
        edges { node { path additions deletions changeType } }
        pageInfo { hasNextPage endCursor }
      }
    }
  }
}
"#;

        let mut files = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let variables = json!({
                "owner": repo.owner,
                "name": repo.name,
                "number": number,
                "cursor": cursor,
            });
            let (status, body) = self
                .send(
                    "POST",
                    GRAPHQL_URL,
                    self.authed(self.http.post(GRAPHQL_URL)).json(&json!({
                        "query": QUERY,
                        "variables": variables,
                    })),
                )
                .await?;
            Self::check_ok("POST", GRAPHQL_URL, status, &body)?;

            let parsed: GqlResponse = serde_json::from_value(body.clone())
                .map_err(|err| HostError::new("POST", GRAPHQL_URL, status, err.to_string()))?;

            let gql_files = parsed
                .data
                .and_then(|d| d.repository)
                .and_then(|r| r.pull_request)
                .map(|pr| pr.files)
                .ok_or_else(|| {
                    HostError::new("POST", GRAPHQL_URL, status, "pull request not found in response")
                })?;

            for edge in gql_files.edges {
                let Some(status) = FileStatus::parse(&edge.node.change_type) else {
                    tracing::warn!(change_type = %edge.node.change_type, "unrecognized file status, skipping");
                    continue;
                };
                files.push(ChangedFile {
                    path: edge.node.path,
                    status,
                    additions: edge.node.additions,
                    deletions: edge.node.deletions,
                });
            }

            if gql_files.page_info.has_next_page {
                cursor = gql_files.page_info.end_cursor;
            } else {
                break;
            }
        }
        Ok(files)
    }

    async fn get_ref(&self, repo: &RepoRef, branch: &str) -> Result<String, HostError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/git/ref/heads/{branch}",
            repo.owner, repo.name
        );
        let (status, body) = self.send("GET", &url, self.authed(self.http.get(&url))).await?;
        Self::check_ok("GET", &url, status, &body)?;
        body.get("object")
            .and_then(|o| o.get("sha"))
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| HostError::new("GET", &url, status, "missing object.sha"))
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> Result<String, HostError> {
        let mut tree = Vec::with_capacity(entries.len());
        for entry in entries {
            let blob_sha = self.create_blob(repo, &entry.bytes).await?;
            tree.push(json!({
                "path": entry.path,
                "mode": "100644",
                "type": "blob",
                "sha": blob_sha,
            }));
        }

        let url = format!("{API_BASE}/repos/{}/{}/git/trees", repo.owner, repo.name);
        let (status, body) = self
            .send(
                "POST",
                &url,
                self.authed(self.http.post(&url)).json(&json!({
                    "base_tree": base_tree_sha,
                    "tree": tree,
                })),
            )
            .await?;
        Self::check_ok("POST", &url, status, &body)?;
        body.get("sha")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| HostError::new("POST", &url, status, "missing tree sha"))
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        author: &CommitAuthor,
    ) -> Result<String, HostError> {
        let url = format!("{API_BASE}/repos/{}/{}/git/commits", repo.owner, repo.name);
        let (status, body) = self
            .send(
                "POST",
                &url,
                self.authed(self.http.post(&url)).json(&json!({
                    "message": message,
                    "tree": tree_sha,
                    "parents": [parent_sha],
                    "author": { "name": author.name, "email": author.email },
                    "committer": { "name": author.name, "email": author.email },
                })),
            )
            .await?;
        Self::check_ok("POST", &url, status, &body)?;
        body.get("sha")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| HostError::new("POST", &url, status, "missing commit sha"))
    }

    async fn create_ref(&self, repo: &RepoRef, ref_name: &str, sha: &str) -> Result<(), HostError> {
        let url = format!("{API_BASE}/repos/{}/{}/git/refs", repo.owner, repo.name);
        let (status, body) = self
            .send(
                "POST",
                &url,
                self.authed(self.http.post(&url)).json(&json!({
                    "ref": format!("refs/heads/{ref_name}"),
                    "sha": sha,
                })),
            )
            .await?;
        Self::check_ok("POST", &url, status, &body)
    }

    async fn update_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        commit_sha: &str,
    ) -> Result<(), HostError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/git/refs/heads/{branch}",
            repo.owner, repo.name
        );
        let (status, body) = self
            .send(
                "PATCH",
                &url,
                self.authed(self.http.patch(&url)).json(&json!({
                    "sha": commit_sha,
                    "force": false,
                })),
            )
            .await?;
        Self::check_ok("PATCH", &url, status, &body)
    }

    async fn delete_ref(&self, repo: &RepoRef, branch: &str) -> Result<(), HostError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/git/refs/heads/{branch}",
            repo.owner, repo.name
        );
        let (status, body) = self.send("DELETE", &url, self.authed(self.http.delete(&url))).await?;
        Self::check_ok("DELETE", &url, status, &body)
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest, HostError> {
        let url = format!("{API_BASE}/repos/{}/{}/pulls", repo.owner, repo.name);
        let (status, resp_body) = self
            .send(
                "POST",
                &url,
                self.authed(self.http.post(&url)).json(&json!({
                    "title": title,
                    "body": body,
                    "head": head,
                    "base": base,
                })),
            )
            .await?;
        Self::check_ok("POST", &url, status, &resp_body)?;
        let number = resp_body
            .get("number")
            .and_then(|n| n.as_u64())
            .ok_or_else(|| HostError::new("POST", &url, status, "missing number"))?;
        let html_url = resp_body
            .get("html_url")
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(PullRequest { number, html_url })
    }

    async fn merge_pull_request(&self, repo: &RepoRef, number: u64) -> Result<MergeResult, HostError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls/{number}/merge",
            repo.owner, repo.name
        );
        let (status, body) = self
            .send(
                "PUT",
                &url,
                self.authed(self.http.put(&url)).json(&json!({ "merge_method": "merge" })),
            )
            .await?;

        let merged = body.get("merged").and_then(|m| m.as_bool()).unwrap_or(false);
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() || !merged {
            return Err(HostError::new("PUT", &url, status, message));
        }
        Ok(MergeResult { merged, message })
    }
}
