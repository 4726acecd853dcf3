//! Decoding the `pull_request` webhook event body (§4.8 step 4, §6).

use copier_pipeline::WebhookContext;
use copier_types::RepoRef;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    action: String,
    pull_request: PullRequestBody,
    repository: RepositoryBody,
}

#[derive(Debug, Deserialize)]
struct PullRequestBody {
    number: u64,
    merged: bool,
    merge_commit_sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryBody {
    full_name: String,
}

/// The outcome of inspecting a decoded `pull_request` event.
pub enum DecodedEvent {
    /// A merged `closed` pull request that should be processed (§4.8 step 4).
    MergedPullRequest(WebhookContext),
    /// Any other action, or a `closed`-but-not-merged PR: no side effects.
    Ignored,
}

/// Parses the raw JSON body of a `pull_request` event and decides whether it
/// is the "closed and merged" event this service reacts to.
///
/// All other actions (`opened`, `reopened`, `closed` without `merged`, ...)
/// resolve to [`DecodedEvent::Ignored`] rather than an error, matching §4.8
/// step 4's "all others return 204/202 without side effects."
pub fn decode_pull_request_event(body: &[u8]) -> Result<DecodedEvent, serde_json::Error> {
    let event: PullRequestEvent = serde_json::from_slice(body)?;

    if event.action != "closed" || !event.pull_request.merged {
        return Ok(DecodedEvent::Ignored);
    }

    let Some(merge_commit_sha) = event.pull_request.merge_commit_sha else {
        return Ok(DecodedEvent::Ignored);
    };

    let Ok(repo) = RepoRef::parse(&event.repository.full_name) else {
        return Ok(DecodedEvent::Ignored);
    };

    Ok(DecodedEvent::MergedPullRequest(WebhookContext {
        repo,
        pr_number: event.pull_request.number,
        merge_commit_sha,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(action: &str, merged: bool, sha: Option<&str>) -> Vec<u8> {
        serde_json::json!({
            "action": action,
            "pull_request": {
                "number": 42,
                "merged": merged,
                "merge_commit_sha": sha,
            },
            "repository": { "full_name": "acme/src" },
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn merged_closed_pr_decodes() {
        let decoded = decode_pull_request_event(&body("closed", true, Some("abc123"))).unwrap();
        match decoded {
            DecodedEvent::MergedPullRequest(ctx) => {
                assert_eq!(ctx.pr_number, 42);
                assert_eq!(ctx.merge_commit_sha, "abc123");
                assert_eq!(ctx.repo.to_string(), "acme/src");
            }
            DecodedEvent::Ignored => panic!("expected MergedPullRequest"),
        }
    }

    #[test]
    fn closed_but_not_merged_is_ignored() {
        let decoded = decode_pull_request_event(&body("closed", false, None)).unwrap();
        assert!(matches!(decoded, DecodedEvent::Ignored));
    }

    #[test]
    fn opened_action_is_ignored() {
        let decoded = decode_pull_request_event(&body("opened", false, None)).unwrap();
        assert!(matches!(decoded, DecodedEvent::Ignored));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode_pull_request_event(b"not json").is_err());
    }
}
