//! Pattern matching, path transformation, message templating, and
//! transformation dispatch for file-copier (L1, L2, L3, L5).

pub mod error;
pub mod message;
pub mod path_transform;
pub mod pattern;
pub mod transform_engine;

pub use error::{MatchError, TransformError};
pub use message::{
    commit_message, default_commit_message, default_pr_body, default_pr_title, pr_body,
    pr_title, render, MessageContext,
};
pub use path_transform::{builtin_variables, transform};
pub use pattern::{is_excluded, match_glob, match_path, match_prefix, match_regex};
pub use transform_engine::{apply, apply_copy, apply_glob, apply_move, apply_regex, first_match};
