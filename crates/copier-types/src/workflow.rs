//! New-format workflow configuration (§3 Workflow, Transformation) and the
//! `$ref` substitution fields the loader expands (§4.5 step 3f).

use serde::{Deserialize, Serialize};

use crate::config::{CommitStrategyConfig, Defaults, DeprecationCheck};
use crate::repo_ref::RepoRef;

/// Source side of a workflow. `repo` is `None` until the loader applies
/// "source context" inheritance from the enclosing reference (§4.5 step 3d).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub repo: Option<RepoRef>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Destination side of a workflow; always concrete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationRef {
    pub repo: RepoRef,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// A reference to externally-defined content, substituted by the loader
/// (§4.5 step 3f). Relative paths resolve against the workflow document's
/// directory; `repo://owner/name/path@branch` fetches cross-repo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefSpec {
    #[serde(rename = "$ref")]
    pub r#ref: String,
}

/// A `transformations` field: either an inline list or an unexpanded `$ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformationsField {
    Ref(RefSpec),
    Inline(Vec<Transformation>),
}

impl Default for TransformationsField {
    fn default() -> Self {
        Self::Inline(Vec::new())
    }
}

impl TransformationsField {
    /// Returns the inline list, or `None` if this field is still an
    /// unexpanded `$ref` (a validation failure by the time the pipeline
    /// sees it).
    pub fn resolved(&self) -> Option<&[Transformation]> {
        match self {
            Self::Inline(list) => Some(list),
            Self::Ref(_) => None,
        }
    }
}

/// An `exclude` field: either an inline list of regex patterns or an
/// unexpanded `$ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludeField {
    Ref(RefSpec),
    Inline(Vec<String>),
}

impl Default for ExcludeField {
    fn default() -> Self {
        Self::Inline(Vec::new())
    }
}

impl ExcludeField {
    pub fn resolved(&self) -> Option<&[String]> {
        match self {
            Self::Inline(list) => Some(list),
            Self::Ref(_) => None,
        }
    }
}

/// A `commit_strategy` field: either an inline config or an unexpanded
/// `$ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommitStrategyField {
    Ref(RefSpec),
    Inline(CommitStrategyConfig),
}

impl CommitStrategyField {
    pub fn resolved(&self) -> Option<&CommitStrategyConfig> {
        match self {
            Self::Inline(cfg) => Some(cfg),
            Self::Ref(_) => None,
        }
    }
}

/// A single source-to-destination specification with its own
/// pattern/transform/strategy (§3 Workflow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub source: SourceRef,
    pub destination: DestinationRef,
    #[serde(default)]
    pub transformations: TransformationsField,
    #[serde(default)]
    pub exclude: ExcludeField,
    #[serde(default)]
    pub commit_strategy: Option<CommitStrategyField>,
    #[serde(default)]
    pub deprecation_check: Option<DeprecationCheck>,
    #[serde(default)]
    pub defaults: Option<Defaults>,
}

/// A single path transformation (§3, §4.4). The variant is selected by
/// which key is present in the YAML mapping (`move`, `copy`, `glob`,
/// `regex`) rather than by an explicit discriminator field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transformation {
    Move { from: String, to: String },
    Copy { from: String, to: String },
    Glob { pattern: String, transform: String },
    Regex { pattern: String, transform: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformation_picks_variant_by_key() {
        let yaml = "move:\n  from: a\n  to: b\n";
        let t: Transformation = serde_yaml::from_str(yaml).unwrap();
        match t {
            Transformation::Move { from, to } => {
                assert_eq!(from, "a");
                assert_eq!(to, "b");
            }
            other => panic!("expected Move, got {other:?}"),
        }
    }

    #[test]
    fn transformations_field_defaults_to_empty_inline() {
        let field = TransformationsField::default();
        assert_eq!(field.resolved(), Some(&[][..]));
    }

    #[test]
    fn ref_field_resolves_to_none() {
        let field = TransformationsField::Ref(RefSpec {
            r#ref: "strategies/pr.yaml".to_string(),
        });
        assert!(field.resolved().is_none());
    }
}
