//! Matching and staging for the new-format `workflows` configuration
//! (§4.4, §4.9, §8 invariant 5).

use chrono::Utc;
use copier_github::HostClient;
use copier_match::MessageContext;
use copier_types::{ChangedFile, DeprecationEntry, RepoRef, UploadKey, Workflow};

use crate::metrics::RunMetrics;
use crate::store::{FileStateStore, StagedUpload};

/// Runs every workflow whose `source.repo` matches the event's repository
/// against every changed file, staging uploads/deprecations for each match.
///
/// The upload key is `{ destination.repo, destination.branch, strategy }`
/// (§4.9) with `rule_name` carrying the workflow name only when
/// `batch_by_repo` is `false` — matching `legacy_pipeline`'s own
/// `rule_name` handling, this is what lets two workflows targeting the same
/// `(repo, branch, strategy)` coalesce into one [`UploadKey`] when batching
/// is enabled (§8 invariant 6).
///
/// A workflow with an unresolved `$ref` (`transformations.resolved()` or
/// `exclude.resolved()` returning `None`) is skipped entirely: the loader is
/// responsible for expanding refs before a [`Workflow`] reaches this stage,
/// so an unresolved one here indicates validation was bypassed.
pub async fn process(
    store: &mut FileStateStore,
    host: &dyn HostClient,
    workflows: &[Workflow],
    event_repo: &RepoRef,
    merge_commit_sha: &str,
    changed_files: &[ChangedFile],
    metrics: &mut RunMetrics,
    batch_by_repo: bool,
) {
    for workflow in workflows {
        let Some(source_repo) = &workflow.source.repo else {
            continue;
        };
        if source_repo != event_repo {
            continue;
        }
        let Some(transformations) = workflow.transformations.resolved() else {
            tracing::warn!(workflow = workflow.name, "unresolved transformations ref, skipping workflow");
            continue;
        };
        let Some(exclude) = workflow.exclude.resolved() else {
            tracing::warn!(workflow = workflow.name, "unresolved exclude ref, skipping workflow");
            continue;
        };
        let source_branch = workflow.source.branch.as_deref().unwrap_or("main");

        for file in changed_files {
            let (dest_path, captured_variables) =
                match copier_match::first_match(transformations, exclude, &file.path) {
                    Ok(Some(result)) => result,
                    Ok(None) => {
                        metrics.record_skipped();
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(workflow = workflow.name, path = file.path, error = %err, "transform failed, skipping file");
                        metrics.record_skipped();
                        continue;
                    }
                };
            metrics.record_matched();

            if file.status.is_deletion() {
                stage_deprecation(store, workflow, &dest_path, metrics);
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

            let strategy = workflow
                .commit_strategy
                .as_ref()
                .and_then(|cs| cs.resolved())
                .cloned()
                .unwrap_or_default();

            let mut variables = captured_variables;
            variables.insert("path".to_string(), file.path.clone());

            let ctx = MessageContext {
                rule_name: workflow.name.clone(),
                source_repo: source_repo.to_string(),
                source_branch: source_branch.to_string(),
                target_repo: workflow.destination.repo.to_string(),
                target_branch: workflow.destination.branch.clone(),
                file_count: 1,
                pr_number: None,
                commit_sha: None,
                variables,
            };

            let commit_message = copier_match::commit_message(strategy.commit_message.as_deref().unwrap_or(""), &ctx);
            let pr_title = copier_match::pr_title(strategy.pr_title.as_deref().unwrap_or(""), &ctx);
            let pr_body = copier_match::pr_body(strategy.pr_body.as_deref().unwrap_or(""), &ctx);

            let key = UploadKey {
                repo: workflow.destination.repo.clone(),
                branch_ref: workflow.destination.branch.clone(),
                strategy: strategy.strategy_type,
                rule_name: if batch_by_repo { None } else { Some(workflow.name.clone()) },
            };
            let staged = StagedUpload {
                path: dest_path,
                bytes,
                target_branch: workflow.destination.branch.clone(),
                commit_strategy: strategy.strategy_type,
                commit_message,
                pr_title,
                pr_body,
                auto_merge: strategy.auto_merge,
                use_pr_template: strategy.use_pr_template,
            };
            store.add_upload(key, staged, batch_by_repo);
            metrics.record_uploaded(1);
        }
    }
}

fn stage_deprecation(store: &mut FileStateStore, workflow: &Workflow, dest_path: &str, metrics: &mut RunMetrics) {
    let Some(check) = &workflow.deprecation_check else {
        return;
    };
    if !check.enabled {
        return;
    }
    store.add_deprecation(
        check.manifest_path.clone(),
        DeprecationEntry {
            file_name: dest_path.to_string(),
            repo: workflow.destination.repo.as_key(),
            branch: workflow.destination.branch.clone(),
            deleted_on: Utc::now(),
        },
    );
    metrics.record_deprecated(1);
}
