//! Error types for matching and transformation (§7 MatchError, TransformError).

use thiserror::Error;

/// A pattern-match failure. Per §4.1, a bad pattern is a warning, not fatal:
/// the file is skipped for that rule but other rules still run.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// A path-template rendering failure (§4.2, §7 TransformError).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The template contained `${name}` placeholders with no matching
    /// variable. Carries the exact set of unresolved names (§8 invariant 4).
    #[error("unresolved template variables: {0:?}")]
    UnreplacedVariables(Vec<String>),
}
