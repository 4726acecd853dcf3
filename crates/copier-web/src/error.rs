//! HTTP-facing error type for the webhook ingress (§6, §7 InputError).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failures that can occur before a webhook is acknowledged (§4.8 steps 1-4).
///
/// Each variant maps to exactly one status code from §6's response table;
/// nothing past acknowledgement surfaces through this type, since §4.8 step
/// 5 detaches processing onto its own task.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("request body exceeds the 1 MiB limit")]
    BodyTooLarge,

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("missing X-GitHub-Event header")]
    MissingEventHeader,

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("signature verification failed")]
    BadSignature,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::BodyTooLarge | WebError::BodyRead(_) | WebError::MissingEventHeader | WebError::MalformedJson(_) => {
                StatusCode::BAD_REQUEST
            }
            WebError::BadSignature => StatusCode::UNAUTHORIZED,
        };
        let body = ErrorBody { status: "rejected", error: self.to_string() };
        (status, axum::Json(body)).into_response()
    }
}
