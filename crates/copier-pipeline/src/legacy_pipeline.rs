//! Matching and staging for the legacy `copy_rules` configuration format
//! (§4.1, §4.6, §8 invariants 1-6).

use chrono::Utc;
use copier_github::HostClient;
use copier_match::{match_path, MessageContext};
use copier_types::{ChangedFile, Config, DeprecationEntry, RepoRef, UploadKey};

use crate::metrics::RunMetrics;
use crate::store::{FileStateStore, StagedUpload};

/// Matches every changed file against every `copy_rules[]` entry and stages
/// the resulting uploads and deprecations.
///
/// Content is always fetched at `merge_commit_sha`, never branch HEAD (§8
/// invariant 8), since the source branch may have moved on by the time the
/// webhook task runs.
pub async fn process(
    store: &mut FileStateStore,
    host: &dyn HostClient,
    config: &Config,
    source_repo: &RepoRef,
    source_branch: &str,
    merge_commit_sha: &str,
    changed_files: &[ChangedFile],
    metrics: &mut RunMetrics,
) {
    for file in changed_files {
        let mut any_rule_matched = false;

        for rule in &config.copy_rules {
            let result = match_path(&file.path, &rule.source_pattern);
            if !result.matched {
                continue;
            }
            any_rule_matched = true;

            for target in &rule.targets {
                let dest_path = match copier_match::transform(&file.path, &target.path_transform, &result.variables) {
                    Ok(path) => path,
                    Err(err) => {
                        tracing::warn!(rule = rule.name, path = file.path, error = %err, "path transform failed, skipping target");
                        metrics.record_skipped();
                        continue;
                    }
                };

                if file.status.is_deletion() {
                    stage_deprecation(store, target, &dest_path, metrics);
                    continue;
                }

                let Ok(Some(bytes)) = host
                    .get_content(source_repo, &file.path, merge_commit_sha)
                    .await
                else {
                    tracing::warn!(path = file.path, sha = merge_commit_sha, "source content unreadable at merge commit, skipping");
                    metrics.record_skipped();
                    continue;
                };

                let mut ctx = MessageContext {
                    rule_name: rule.name.clone(),
                    source_repo: source_repo.to_string(),
                    source_branch: source_branch.to_string(),
                    target_repo: target.repo.to_string(),
                    target_branch: target.branch.clone(),
                    file_count: 1,
                    pr_number: None,
                    commit_sha: None,
                    variables: result.variables.clone(),
                };
                ctx.variables.insert("path".to_string(), file.path.clone());

                let cs = &target.commit_strategy;
                let commit_message = copier_match::commit_message(cs.commit_message.as_deref().unwrap_or(""), &ctx);
                let pr_title = copier_match::pr_title(cs.pr_title.as_deref().unwrap_or(""), &ctx);
                let pr_body = copier_match::pr_body(cs.pr_body.as_deref().unwrap_or(""), &ctx);

                let key = UploadKey {
                    repo: target.repo.clone(),
                    branch_ref: target.branch.clone(),
                    strategy: cs.strategy_type,
                    rule_name: if config.batch_by_repo { None } else { Some(rule.name.clone()) },
                };
                let staged = StagedUpload {
                    path: dest_path,
                    bytes,
                    target_branch: target.branch.clone(),
                    commit_strategy: cs.strategy_type,
                    commit_message,
                    pr_title,
                    pr_body,
                    auto_merge: cs.auto_merge,
                    use_pr_template: cs.use_pr_template,
                };
                store.add_upload(key, staged, config.batch_by_repo);
                metrics.record_uploaded(1);
            }
        }

        if any_rule_matched {
            metrics.record_matched();
        } else {
            metrics.record_skipped();
        }
    }
}

fn stage_deprecation(
    store: &mut FileStateStore,
    target: &copier_types::TargetConfig,
    dest_path: &str,
    metrics: &mut RunMetrics,
) {
    let Some(check) = &target.deprecation_check else {
        return;
    };
    if !check.enabled {
        return;
    }
    store.add_deprecation(
        check.manifest_path.clone(),
        DeprecationEntry {
            file_name: dest_path.to_string(),
            repo: target.repo.as_key(),
            branch: target.branch.clone(),
            deleted_on: Utc::now(),
        },
    );
    metrics.record_deprecated(1);
}
