//! The webhook ingress route (§4.8 steps 1-5, §6).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use copier_config::Loader;
use copier_github::HostClient;
use copier_pipeline::Writer;
use copier_types::RepoRef;
use tower_http::trace::TraceLayer;

use crate::error::WebError;
use crate::{payload, signature};

/// Body-size ceiling named in §4.8 step 1.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the webhook route.
///
/// One `WebState` is built at startup and cloned per request; everything it
/// holds is itself cheap to clone (`Arc`s and small copies).
#[derive(Clone)]
pub struct WebState {
    pub host: Arc<dyn HostClient>,
    pub loader: Arc<Loader>,
    pub writer: Arc<Writer>,
    pub main_doc_path: Arc<str>,
    pub config_repo: RepoRef,
    pub config_branch: Arc<str>,
    /// `None` disables signature verification (§4.8 step 3: "when a secret
    /// is configured").
    pub webhook_secret: Option<Arc<[u8]>>,
    /// The detached post-ack task's own deadline (§5, §9); never the
    /// inbound request's.
    pub process_deadline: Duration,
}

/// Builds the webhook router, mounting the handler at `webhook_path`.
///
/// Generic over `S` so a binary composing several route groups under one
/// outer state can still pull `WebState` out via
/// [`axum::extract::FromRef`].
pub fn webhook_routes<S>(webhook_path: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    WebState: axum::extract::FromRef<S>,
{
    Router::new()
        .route(webhook_path, post(webhook_handler))
        .layer(TraceLayer::new_for_http())
}

async fn webhook_handler(
    State(state): State<WebState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, WebError> {
    let event_header = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebError::MissingEventHeader)?
        .to_string();

    let body_bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|err| WebError::BodyRead(err.to_string()))?;
    if body_bytes.len() > MAX_BODY_BYTES {
        return Err(WebError::BodyTooLarge);
    }

    if let Some(secret) = &state.webhook_secret {
        let signature_header = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .ok_or(WebError::BadSignature)?;
        if !signature::verify(secret, &body_bytes, signature_header) {
            return Err(WebError::BadSignature);
        }
    }

    if event_header != "pull_request" {
        record_ignored(&event_header);
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let decoded = payload::decode_pull_request_event(&body_bytes)
        .map_err(|err| WebError::MalformedJson(err.to_string()))?;

    let ctx = match decoded {
        payload::DecodedEvent::MergedPullRequest(ctx) => ctx,
        payload::DecodedEvent::Ignored => {
            record_ignored("pull_request");
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
    };

    // §4.8 step 5: acknowledge immediately, then process on a detached task
    // carrying its own deadline rather than the request's (§9).
    let spawned_state = state.clone();
    tokio::spawn(async move {
        let outcome = copier_pipeline::process_with_deadline(
            &spawned_state.loader,
            spawned_state.host.as_ref(),
            &spawned_state.writer,
            &spawned_state.main_doc_path,
            &spawned_state.config_repo,
            &spawned_state.config_branch,
            &ctx,
            spawned_state.process_deadline,
        )
        .await;
        match outcome {
            Ok(event) => event.emit(),
            Err(err) => tracing::warn!(repo = %ctx.repo, error = %err, "webhook processing failed"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "accepted" }))).into_response())
}

/// Records the `ignored_by_event_type` metric (§4.8 step 12) for an event
/// this service took no action on, via the same structured-audit path the
/// pipeline uses for processed webhooks.
fn record_ignored(event: &str) {
    let mut metrics = copier_pipeline::RunMetrics::new();
    metrics.record_ignored();
    copier_pipeline::AuditEvent {
        outcome: copier_pipeline::AuditOutcome::IgnoredEvent,
        repo: event.to_string(),
        pr_number: None,
        metrics,
    }
    .emit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as AxumBody;
    use axum::http::{Request, StatusCode as HttpStatusCode};
    use copier_github::{CommitAuthor, FakeHostClient};
    use tower::ServiceExt;

    fn test_state(secret: Option<&str>) -> WebState {
        let fake = Arc::new(FakeHostClient::new());
        let config_repo = RepoRef { owner: "acme".to_string(), name: "config".to_string() };
        let loader = Arc::new(Loader::new(fake.clone(), config_repo.clone(), "main".to_string()));
        let writer = Arc::new(Writer::new(
            fake.clone(),
            CommitAuthor { name: "file-copier".to_string(), email: "copier@example.com".to_string() },
        ));
        WebState {
            host: fake,
            loader,
            writer,
            main_doc_path: Arc::from("copier.yaml"),
            config_repo,
            config_branch: Arc::from("main"),
            webhook_secret: secret.map(|s| Arc::from(s.as_bytes())),
            process_deadline: Duration::from_secs(30),
        }
    }

    fn router(state: WebState) -> Router {
        webhook_routes::<WebState>("/webhook").with_state(state)
    }

    #[tokio::test]
    async fn missing_event_header_is_bad_request() {
        let app = router(test_state(None));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/webhook").body(AxumBody::from("{}")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_pull_request_event_is_no_content() {
        let app = router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("X-GitHub-Event", "ping")
                    .body(AxumBody::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let app = router(test_state(Some("shh")));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("X-GitHub-Event", "pull_request")
                    .header("X-Hub-Signature-256", "sha256=deadbeef")
                    .body(AxumBody::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_merged_pull_request_is_no_content() {
        let app = router(test_state(None));
        let body = serde_json::json!({
            "action": "opened",
            "pull_request": { "number": 1, "merged": false, "merge_commit_sha": null },
            "repository": { "full_name": "acme/src" },
        })
        .to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("X-GitHub-Event", "pull_request")
                    .body(AxumBody::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn merged_pull_request_is_accepted() {
        let app = router(test_state(None));
        let body = serde_json::json!({
            "action": "closed",
            "pull_request": { "number": 7, "merged": true, "merge_commit_sha": "abc123" },
            "repository": { "full_name": "acme/src" },
        })
        .to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("X-GitHub-Event", "pull_request")
                    .body(AxumBody::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::ACCEPTED);
    }
}
