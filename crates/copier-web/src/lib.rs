//! HTTP webhook ingress for file-copier (§6, L8 steps 1-5).
//!
//! Everything here is the boundary §1 calls "injected interfaces": body-size
//! limiting, header/signature checks, event filtering, and the 202-then-
//! detach handoff into [`copier_pipeline`]. The actual PR-processing logic
//! lives there, not here.

pub mod error;
pub mod payload;
pub mod routes;
pub mod signature;

pub use error::WebError;
pub use routes::{webhook_routes, WebState};
