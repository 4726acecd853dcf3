//! Configuration errors (§7 ConfigError).

use thiserror::Error;

/// A configuration loading/validation failure.
///
/// Per §4.5 and §7: the whole pipeline is fatal only when the main document
/// cannot be parsed or the merge produces zero usable workflows/rules.
/// Per-reference failures (a `$ref` target, a `workflow_configs[i]` entry)
/// are warnings — logged and skipped, not propagated as this error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("main configuration document could not be read from any source")]
    MainDocumentUnreadable,

    #[error("main configuration document is malformed: {0}")]
    MalformedMainDocument(#[source] serde_yaml::Error),

    #[error("workflow document is malformed: {0}")]
    MalformedWorkflowDocument(#[source] serde_yaml::Error),

    #[error("merged configuration has zero usable workflows or copy rules")]
    NoUsableEntries,

    #[error("invalid pattern type in rule '{rule}': {pattern_type}")]
    InvalidPatternType { rule: String, pattern_type: String },

    #[error("duplicate rule name '{0}'")]
    DuplicateRuleName(String),

    #[error("rule '{0}' has an empty source pattern")]
    EmptySourcePattern(String),

    #[error("rule '{0}' pattern failed to compile: {1}")]
    PatternDoesNotCompile(String, String),

    #[error("workflow '{0}' has no transformations")]
    WorkflowHasNoTransformations(String),

    #[error("malformed $ref target '{0}'")]
    MalformedRef(String),

    #[error("document '{0}' is not valid utf-8")]
    InvalidUtf8(String),

    #[error("io error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("host error resolving '{path}' in {repo}: {source}")]
    Host {
        repo: String,
        path: String,
        #[source]
        source: copier_github::HostError,
    },
}
