//! Defaults precedence merge (§4.5 step 3e, §9 invariant 9).
//!
//! Precedence, most to least specific: workflow's own `defaults` > workflow
//! document's `defaults` > main document's `defaults`. Fields are taken from
//! the most specific layer that sets them; unset fields fall through.
//!
//! `commit_strategy.auto_merge` is the one field that never falls through:
//! a workflow with no explicit `commit_strategy` gets `auto_merge = false`
//! regardless of what any `defaults` layer sets, since an inherited
//! auto-merge would let a single shared defaults block silently enable
//! unattended merges across every workflow that forgot to override it.

use copier_types::{CommitStrategyConfig, Defaults};

/// Merges three `defaults` layers, most specific first.
pub fn merge(layers: &[Option<&Defaults>]) -> Defaults {
    let mut exclude = Vec::new();
    let mut commit_strategy = None;
    let mut path_transform = None;
    let mut branch = None;

    for layer in layers.iter().flatten() {
        if exclude.is_empty() && !layer.exclude.is_empty() {
            exclude = layer.exclude.clone();
        }
        if commit_strategy.is_none() {
            commit_strategy = layer.commit_strategy.clone();
        }
        if path_transform.is_none() {
            path_transform = layer.path_transform.clone();
        }
        if branch.is_none() {
            branch = layer.branch.clone();
        }
    }

    Defaults {
        exclude,
        commit_strategy: commit_strategy.map(strip_inherited_auto_merge),
        path_transform,
        branch,
    }
}

/// `auto_merge` from a `defaults` block must never reach a workflow that
/// didn't set its own `commit_strategy` explicitly (§9 invariant 9). The
/// merged `Defaults` is only ever consulted as a *fallback* for a workflow
/// with no `commit_strategy` of its own, so any `auto_merge` surviving into
/// it here would be exactly that silent inheritance.
fn strip_inherited_auto_merge(mut cfg: CommitStrategyConfig) -> CommitStrategyConfig {
    cfg.auto_merge = false;
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use copier_types::CommitStrategyType;
    use pretty_assertions::assert_eq;

    #[test]
    fn most_specific_layer_wins_per_field() {
        let workflow = Defaults {
            branch: Some("feature".to_string()),
            ..Default::default()
        };
        let doc = Defaults {
            branch: Some("doc-branch".to_string()),
            path_transform: Some("${path}".to_string()),
            ..Default::default()
        };
        let main = Defaults {
            path_transform: Some("main-transform".to_string()),
            exclude: vec!["*.tmp".to_string()],
            ..Default::default()
        };

        let merged = merge(&[Some(&workflow), Some(&doc), Some(&main)]);
        assert_eq!(merged.branch.as_deref(), Some("feature"));
        assert_eq!(merged.path_transform.as_deref(), Some("${path}"));
        assert_eq!(merged.exclude, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn missing_layers_fall_through_to_none() {
        let merged = merge(&[None, None, None]);
        assert!(merged.branch.is_none());
        assert!(merged.commit_strategy.is_none());
    }

    #[test]
    fn auto_merge_never_inherited_from_defaults() {
        let main = Defaults {
            commit_strategy: Some(CommitStrategyConfig {
                strategy_type: CommitStrategyType::PullRequest,
                auto_merge: true,
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge(&[None, None, Some(&main)]);
        let cs = merged.commit_strategy.expect("commit_strategy inherited");
        assert!(!cs.auto_merge, "auto_merge leaked through defaults merge");
        assert_eq!(cs.strategy_type, CommitStrategyType::PullRequest);
    }
}
