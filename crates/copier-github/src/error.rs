//! Host API error type (§7 HostError).

use thiserror::Error;

/// Any VCS host API failure. Carries enough context to diagnose which call
/// failed without leaking secrets (§7).
#[derive(Debug, Error)]
#[error("{method} {url} -> {status}: {body_excerpt}")]
pub struct HostError {
    pub method: String,
    pub url: String,
    pub status: String,
    pub body_excerpt: String,
}

impl HostError {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        status: impl std::fmt::Display,
        body_excerpt: impl Into<String>,
    ) -> Self {
        let mut excerpt: String = body_excerpt.into();
        excerpt.truncate(500);
        Self {
            method: method.into(),
            url: url.into(),
            status: status.to_string(),
            body_excerpt: excerpt,
        }
    }

    pub fn transport(method: impl Into<String>, url: impl Into<String>, source: &reqwest::Error) -> Self {
        Self::new(method, url, "transport", source.to_string())
    }
}
