//! The PR pipeline orchestrator (§4.8, L8): ties the config loader, matching
//! stages, and writer together for a single merged pull request.

use std::collections::HashMap;
use std::time::Duration;

use copier_config::Loader;
use copier_github::HostClient;
use copier_match::MessageContext;
use copier_types::{RepoRef, Workflow};

use crate::error::PipelineError;
use crate::legacy_pipeline;
use crate::metrics::{AuditEvent, AuditOutcome, RunMetrics};
use crate::store::FileStateStore;
use crate::writer::Writer;
use crate::{deprecation, workflow_pipeline};

/// The identifying facts about a merged pull request that triggered this
/// webhook (§4.8 steps 6 onward; steps 1-5 live in the web crate).
#[derive(Debug, Clone)]
pub struct WebhookContext {
    pub repo: RepoRef,
    pub pr_number: u64,
    pub merge_commit_sha: String,
}

/// Runs steps 6-12 of the PR pipeline under `deadline`, mapping a timeout to
/// [`PipelineError::Cancelled`] rather than letting the request's own
/// lifetime reach into the detached task (§5, §9 "explicit lifetime").
pub async fn process_with_deadline(
    loader: &Loader,
    host: &dyn HostClient,
    writer: &Writer,
    main_doc_path: &str,
    config_repo: &RepoRef,
    config_branch: &str,
    ctx: &WebhookContext,
    deadline: Duration,
) -> Result<AuditEvent, PipelineError> {
    match tokio::time::timeout(
        deadline,
        process(loader, host, writer, main_doc_path, config_repo, config_branch, ctx),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(repo = %ctx.repo, pr_number = ctx.pr_number, "webhook processing cancelled at deadline");
            Err(PipelineError::Cancelled)
        }
    }
}

/// Steps 6-12 (§4.8): load config, scope to the event's repository, fetch
/// changed files, match and stage, finalize batches, flush, and emit an
/// audit event.
pub async fn process(
    loader: &Loader,
    host: &dyn HostClient,
    writer: &Writer,
    main_doc_path: &str,
    config_repo: &RepoRef,
    config_branch: &str,
    ctx: &WebhookContext,
) -> Result<AuditEvent, PipelineError> {
    let mut metrics = RunMetrics::new();

    let config = match loader.load(main_doc_path).await {
        Ok(config) => config,
        Err(err) => {
            metrics.record_failed();
            tracing::warn!(repo = %ctx.repo, error = %err, "config load failed");
            return Ok(AuditEvent {
                outcome: AuditOutcome::ConfigFailed,
                repo: ctx.repo.to_string(),
                pr_number: Some(ctx.pr_number),
                metrics,
            });
        }
    };

    // §3/§4.9: "exactly one of `copy_rules` (legacy) or `workflows` (new)
    // drives processing" for the merged Config as a whole — legacy takes
    // precedence when both are present, rather than running both pipelines
    // against the same store.
    let use_legacy = !config.copy_rules.is_empty();

    let legacy_in_scope = use_legacy && config.source_repo.as_ref() == Some(&ctx.repo);
    let matching_workflows: Vec<&Workflow> = if use_legacy {
        Vec::new()
    } else {
        config
            .workflows
            .iter()
            .filter(|w| w.source.repo.as_ref() == Some(&ctx.repo))
            .collect()
    };
    let workflow_in_scope = !matching_workflows.is_empty();

    if !legacy_in_scope && !workflow_in_scope {
        metrics.record_failed();
        return Ok(AuditEvent {
            outcome: AuditOutcome::OutOfScope,
            repo: ctx.repo.to_string(),
            pr_number: Some(ctx.pr_number),
            metrics,
        });
    }

    let changed_files = host.pr_files(&ctx.repo, ctx.pr_number).await?;

    let mut store = FileStateStore::new();

    if legacy_in_scope {
        legacy_pipeline::process(
            &mut store,
            host,
            &config,
            &ctx.repo,
            config.source_branch.as_deref().unwrap_or("main"),
            &ctx.merge_commit_sha,
            &changed_files,
            &mut metrics,
        )
        .await;
    } else if workflow_in_scope {
        workflow_pipeline::process(
            &mut store,
            host,
            &config.workflows,
            &ctx.repo,
            &ctx.merge_commit_sha,
            &changed_files,
            &mut metrics,
            config.batch_by_repo,
        )
        .await;
    }

    if config.batch_by_repo {
        finalize_batches(&mut store, &config, ctx);
    }

    for (key, batch) in store.get_uploads() {
        if let Err(err) = writer.flush(&key.repo, batch).await {
            tracing::warn!(repo = %key.repo, branch = batch.target_branch, error = %err, "batch flush failed");
            metrics.record_failed();
        }
    }

    for (manifest_path, entries) in store.get_deprecations() {
        match deprecation::flush_manifest(writer, host, config_repo, config_branch, manifest_path, entries).await {
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(manifest_path, error = %err, "deprecation manifest flush failed");
                metrics.record_failed();
            }
        }
    }

    let outcome = if metrics.failed > 0 {
        AuditOutcome::ConfigFailed
    } else {
        AuditOutcome::Processed
    };
    Ok(AuditEvent {
        outcome,
        repo: ctx.repo.to_string(),
        pr_number: Some(ctx.pr_number),
        metrics,
    })
}

/// Step 10: when `batch_by_repo` is set and a `batch_pr_config` exists,
/// re-render every staged batch's PR title/body using the accurate total
/// file count and the merge commit's 7-character SHA prefix (§8 invariant 6,
/// E6).
fn finalize_batches(store: &mut FileStateStore, config: &copier_types::Config, ctx: &WebhookContext) {
    let Some(batch_pr_config) = &config.batch_pr_config else {
        return;
    };
    let sha_prefix = ctx.merge_commit_sha.get(..7).unwrap_or(&ctx.merge_commit_sha).to_string();

    for (key, batch) in store.uploads_mut().iter_mut() {
        let msg_ctx = MessageContext {
            rule_name: String::new(),
            source_repo: config.source_repo.as_ref().map(|r| r.to_string()).unwrap_or_default(),
            source_branch: config.source_branch.clone().unwrap_or_default(),
            target_repo: key.repo.to_string(),
            target_branch: batch.target_branch.clone(),
            file_count: batch.file_count(),
            pr_number: None,
            commit_sha: Some(sha_prefix.clone()),
            variables: HashMap::new(),
        };
        if let Some(title_tmpl) = &batch_pr_config.pr_title {
            batch.pr_title = copier_match::pr_title(title_tmpl, &msg_ctx);
            batch.commit_message = copier_match::commit_message(title_tmpl, &msg_ctx);
        }
        if let Some(body_tmpl) = &batch_pr_config.pr_body {
            batch.pr_body = copier_match::pr_body(body_tmpl, &msg_ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copier_github::{CommitAuthor, FakeHostClient};
    use copier_types::{ChangedFile, FileStatus};
    use std::sync::Arc;

    fn source_repo() -> RepoRef {
        RepoRef { owner: "acme".to_string(), name: "src".to_string() }
    }

    fn target_repo() -> RepoRef {
        RepoRef { owner: "acme".to_string(), name: "target".to_string() }
    }

    fn config_repo() -> RepoRef {
        RepoRef { owner: "acme".to_string(), name: "config".to_string() }
    }

    fn committer() -> CommitAuthor {
        CommitAuthor { name: "file-copier".to_string(), email: "copier@example.com".to_string() }
    }

    #[tokio::test]
    async fn end_to_end_prefix_copy_direct_commit() {
        let fake = Arc::new(FakeHostClient::new());
        let yaml = r#"
source_repo: acme/src
source_branch: main
copy_rules:
  - name: sync-examples
    source_pattern:
      type: prefix
      pattern: examples/go/
    targets:
      - repo: acme/target
        branch: main
        path_transform: "docs/${relative_path}"
"#;
        fake.seed_content(&config_repo(), "main", "copier.yaml", yaml.as_bytes());
        fake.seed_ref(&target_repo(), "main", "base-sha");
        fake.seed_content(&source_repo(), "main", "examples/go/a.go", b"package a");
        fake.seed_content(&source_repo(), "main", "examples/go/sub/b.go", b"package sub");
        fake.seed_pr_files(
            &source_repo(),
            7,
            vec![
                ChangedFile { path: "examples/go/a.go".to_string(), status: FileStatus::Added, additions: 1, deletions: 0 },
                ChangedFile { path: "examples/go/sub/b.go".to_string(), status: FileStatus::Modified, additions: 1, deletions: 0 },
                ChangedFile { path: "src/other.go".to_string(), status: FileStatus::Added, additions: 1, deletions: 0 },
            ],
        );

        let loader = Loader::new(fake.clone(), config_repo(), "main".to_string());
        let writer = Writer::new(fake.clone(), committer());
        let ctx = WebhookContext { repo: source_repo(), pr_number: 7, merge_commit_sha: "merge-sha".to_string() };

        let event = process(&loader, fake.as_ref(), &writer, "copier.yaml", &config_repo(), "main", &ctx)
            .await
            .unwrap();

        assert_eq!(event.outcome, AuditOutcome::Processed);
        assert_eq!(event.metrics.matched, 2);
        assert_eq!(
            fake.committed_blob(&target_repo(), "main", "docs/a.go"),
            Some(b"package a".to_vec())
        );
        assert_eq!(
            fake.committed_blob(&target_repo(), "main", "docs/sub/b.go"),
            Some(b"package sub".to_vec())
        );
    }

    #[tokio::test]
    async fn webhook_for_unrelated_repo_is_out_of_scope() {
        let fake = Arc::new(FakeHostClient::new());
        let yaml = r#"
source_repo: acme/src
copy_rules:
  - name: sync
    source_pattern:
      type: prefix
      pattern: ""
    targets:
      - repo: acme/target
"#;
        fake.seed_content(&config_repo(), "main", "copier.yaml", yaml.as_bytes());
        let loader = Loader::new(fake.clone(), config_repo(), "main".to_string());
        let writer = Writer::new(fake.clone(), committer());
        let other = RepoRef { owner: "acme".to_string(), name: "unrelated".to_string() };
        let ctx = WebhookContext { repo: other, pr_number: 1, merge_commit_sha: "sha".to_string() };

        let event = process(&loader, fake.as_ref(), &writer, "copier.yaml", &config_repo(), "main", &ctx)
            .await
            .unwrap();
        assert_eq!(event.outcome, AuditOutcome::OutOfScope);
    }

    #[tokio::test]
    async fn legacy_copy_rules_take_precedence_over_in_scope_workflows() {
        // A config carrying both a non-empty `copy_rules` and an in-scope
        // `workflows` entry must drive processing through exactly one
        // format (§3, §4.9) — legacy wins, so only its destination sees a
        // write and the workflow's destination stays untouched.
        let fake = Arc::new(FakeHostClient::new());
        let workflow_target = RepoRef { owner: "acme".to_string(), name: "workflow-target".to_string() };
        let yaml = r#"
source_repo: acme/src
source_branch: main
copy_rules:
  - name: sync-examples
    source_pattern:
      type: prefix
      pattern: examples/go/
    targets:
      - repo: acme/target
        branch: main
        path_transform: "docs/${relative_path}"
workflows:
  - name: sync-via-workflow
    source:
      repo: acme/src
      branch: main
    destination:
      repo: acme/workflow-target
      branch: main
    transformations:
      - move:
          from: examples/go
          to: other-docs
"#;
        fake.seed_content(&config_repo(), "main", "copier.yaml", yaml.as_bytes());
        fake.seed_ref(&target_repo(), "main", "base-sha");
        fake.seed_ref(&workflow_target, "main", "base-sha");
        fake.seed_content(&source_repo(), "main", "examples/go/a.go", b"package a");
        fake.seed_pr_files(
            &source_repo(),
            7,
            vec![ChangedFile { path: "examples/go/a.go".to_string(), status: FileStatus::Added, additions: 1, deletions: 0 }],
        );

        let loader = Loader::new(fake.clone(), config_repo(), "main".to_string());
        let writer = Writer::new(fake.clone(), committer());
        let ctx = WebhookContext { repo: source_repo(), pr_number: 7, merge_commit_sha: "merge-sha".to_string() };

        let event = process(&loader, fake.as_ref(), &writer, "copier.yaml", &config_repo(), "main", &ctx)
            .await
            .unwrap();

        assert_eq!(event.outcome, AuditOutcome::Processed);
        assert_eq!(
            fake.committed_blob(&target_repo(), "main", "docs/a.go"),
            Some(b"package a".to_vec())
        );
        assert!(fake.committed_blob(&workflow_target, "main", "other-docs/a.go").is_none());
    }
}
