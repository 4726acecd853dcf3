//! GitHub App authentication and the host API client boundary for
//! file-copier (§1's "injected interfaces" and §6's abstract host surface).

pub mod auth;
pub mod client;
pub mod error;
pub mod fake;
pub mod github;

pub use auth::{authenticate, AppCredentials, InstallationTokenCache};
pub use client::{CommitAuthor, HostClient, MergeResult, PullRequest, TreeEntry};
pub use error::HostError;
pub use fake::FakeHostClient;
pub use github::GithubClient;
