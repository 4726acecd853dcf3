//! Structural validation of a fully merged [`Config`] (§4.5 step 4, §7).
//!
//! Invalid individual rules/workflows are logged and dropped rather than
//! failing the whole pipeline; only a config left with nothing usable is an
//! error (§7 `NoUsableEntries`).

use copier_types::{Config, CopyRule, PatternType, Workflow};

use crate::error::ConfigError;

/// Validates and filters `cfg` in place, dropping any rule or workflow that
/// fails a structural check. Returns `Err` only when nothing usable
/// remains.
pub fn validate(mut cfg: Config) -> Result<Config, ConfigError> {
    let mut seen_names = std::collections::HashSet::new();

    cfg.copy_rules.retain(|rule| {
        if !seen_names.insert(rule.name.clone()) {
            tracing::warn!(rule = %rule.name, "dropping duplicate rule name");
            return false;
        }
        if let Err(err) = validate_copy_rule(rule) {
            tracing::warn!(rule = %rule.name, error = %err, "dropping invalid rule");
            return false;
        }
        true
    });

    cfg.workflows.retain(|workflow| {
        if !seen_names.insert(workflow.name.clone()) {
            tracing::warn!(workflow = %workflow.name, "dropping duplicate workflow name");
            return false;
        }
        if let Err(err) = validate_workflow(workflow) {
            tracing::warn!(workflow = %workflow.name, error = %err, "dropping invalid workflow");
            return false;
        }
        true
    });

    if cfg.is_empty() {
        return Err(ConfigError::NoUsableEntries);
    }

    Ok(cfg)
}

fn validate_copy_rule(rule: &CopyRule) -> Result<(), ConfigError> {
    if rule.source_pattern.pattern.trim().is_empty() {
        return Err(ConfigError::EmptySourcePattern(rule.name.clone()));
    }
    match rule.source_pattern.pattern_type {
        PatternType::Glob => {
            if let Err(err) = globset::Glob::new(&rule.source_pattern.pattern) {
                return Err(ConfigError::PatternDoesNotCompile(
                    rule.name.clone(),
                    err.to_string(),
                ));
            }
        }
        PatternType::Regex => {
            if let Err(err) = regex::Regex::new(&rule.source_pattern.pattern) {
                return Err(ConfigError::PatternDoesNotCompile(
                    rule.name.clone(),
                    err.to_string(),
                ));
            }
        }
        PatternType::Prefix => {}
    }
    for pattern in &rule.source_pattern.exclude_patterns {
        if regex::Regex::new(pattern).is_err() {
            return Err(ConfigError::PatternDoesNotCompile(
                rule.name.clone(),
                pattern.clone(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_workflow(workflow: &Workflow) -> Result<(), ConfigError> {
    match workflow.transformations.resolved() {
        Some([]) | None => return Err(ConfigError::WorkflowHasNoTransformations(workflow.name.clone())),
        Some(_) => {}
    }
    if let Some(exclude) = workflow.exclude.resolved() {
        for pattern in exclude {
            if regex::Regex::new(pattern).is_err() {
                return Err(ConfigError::PatternDoesNotCompile(
                    workflow.name.clone(),
                    pattern.clone(),
                ));
            }
        }
    }
    Ok(())
}
