//! Legacy `copy_rules`-based configuration (§3 Config, CopyRule, SourcePattern,
//! TargetConfig, CommitStrategyConfig).

use serde::{Deserialize, Serialize};

use crate::repo_ref::RepoRef;
use crate::workflow::Workflow;

/// The merged root configuration for a single installation.
///
/// Exactly one of `copy_rules` (legacy) or `workflows` (new) drives
/// processing for a given webhook; both may be empty only if the resolver
/// produced no valid entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source_repo: Option<RepoRef>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub batch_by_repo: bool,
    #[serde(default)]
    pub batch_pr_config: Option<BatchPrConfig>,
    #[serde(default)]
    pub defaults: Option<Defaults>,
    #[serde(default)]
    pub copy_rules: Vec<CopyRule>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

impl Config {
    /// True when this config has no usable rules or workflows at all.
    pub fn is_empty(&self) -> bool {
        self.copy_rules.is_empty() && self.workflows.is_empty()
    }
}

/// Default values inherited by workflows/rules that omit a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub commit_strategy: Option<CommitStrategyConfig>,
    #[serde(default)]
    pub path_transform: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Per-destination-repo PR title/body used for the batched-finalization pass
/// (§4.6, §4.8 step 10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPrConfig {
    #[serde(default)]
    pub pr_title: Option<String>,
    #[serde(default)]
    pub pr_body: Option<String>,
}

/// A single legacy copy rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRule {
    pub name: String,
    pub source_pattern: SourcePattern,
    pub targets: Vec<TargetConfig>,
}

/// The kind of match a [`SourcePattern`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Prefix,
    Glob,
    Regex,
}

/// A path-matching pattern with optional exclusions (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub pattern: String,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// A single destination for a matched file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub repo: RepoRef,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_path_transform")]
    pub path_transform: String,
    #[serde(default)]
    pub commit_strategy: CommitStrategyConfig,
    #[serde(default)]
    pub deprecation_check: Option<DeprecationCheck>,
}

/// Where the deprecation manifest lives for a given target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeprecationCheck {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_deprecation_path")]
    pub manifest_path: String,
}

impl Default for DeprecationCheck {
    fn default() -> Self {
        Self {
            enabled: false,
            manifest_path: default_deprecation_path(),
        }
    }
}

fn default_deprecation_path() -> String {
    "deprecated.json".to_string()
}

/// How a matched upload batch is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategyType {
    Direct,
    PullRequest,
}

impl Default for CommitStrategyType {
    fn default() -> Self {
        Self::Direct
    }
}

/// Commit/PR strategy configuration (§3 CommitStrategyConfig).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStrategyConfig {
    #[serde(rename = "type", default)]
    pub strategy_type: CommitStrategyType,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub pr_title: Option<String>,
    #[serde(default)]
    pub pr_body: Option<String>,
    #[serde(default)]
    pub auto_merge: bool,
    #[serde(default)]
    pub use_pr_template: bool,
}

impl Default for CommitStrategyConfig {
    fn default() -> Self {
        Self {
            strategy_type: CommitStrategyType::Direct,
            commit_message: None,
            pr_title: None,
            pr_body: None,
            auto_merge: false,
            use_pr_template: false,
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_path_transform() -> String {
    "${path}".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_empty_when_no_rules_or_workflows() {
        let cfg = Config::default();
        assert!(cfg.is_empty());
    }

    #[test]
    fn commit_strategy_defaults_to_direct_no_auto_merge() {
        let cs = CommitStrategyConfig::default();
        assert_eq!(cs.strategy_type, CommitStrategyType::Direct);
        assert!(!cs.auto_merge);
    }

    #[test]
    fn target_config_deserializes_with_defaults() {
        let yaml = r#"
repo: acme/docs
"#;
        let t: TargetConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.branch, "main");
        assert_eq!(t.path_transform, "${path}");
        assert_eq!(t.commit_strategy.strategy_type, CommitStrategyType::Direct);
    }
}
