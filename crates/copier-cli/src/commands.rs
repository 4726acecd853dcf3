//! Subcommand implementations, one function per subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use copier_config::Loader;
use copier_github::{AppCredentials, CommitAuthor, HostClient, InstallationTokenCache};
use copier_match::pattern;
use copier_pipeline::Writer;
use copier_types::RepoRef;
use copier_web::WebState;

use crate::runtime_config::RuntimeConfig;

/// `file-copier serve`: starts the webhook HTTP server (§4.8 steps 1-5, §6).
pub async fn serve() -> Result<()> {
    let config = RuntimeConfig::from_env()?;
    tracing::debug!(debug = config.debug, cloud_logging = config.cloud_logging, "runtime config loaded");

    let http = reqwest::Client::new();
    let key_pem =
        std::fs::read(&config.app_private_key_path).with_context(|| {
            format!("reading GitHub App private key from {}", config.app_private_key_path.display())
        })?;
    let app_creds = AppCredentials::new(config.app_id, key_pem);
    let token_cache = InstallationTokenCache::new();

    let client = copier_github::authenticate(&app_creds, &token_cache, &http, &config.config_repo.owner)
        .await
        .context("authenticating the configuration repository's organization")?;
    let host: Arc<dyn HostClient> = Arc::new(client);

    let loader = Arc::new(Loader::new(host.clone(), config.config_repo.clone(), config.config_branch.clone()));
    let writer = Arc::new(Writer::new(
        host.clone(),
        CommitAuthor { name: config.committer_name.clone(), email: config.committer_email.clone() },
    ));

    let state = WebState {
        host,
        loader,
        writer,
        main_doc_path: Arc::from(config.main_doc_path.as_str()),
        config_repo: config.config_repo.clone(),
        config_branch: Arc::from(config.config_branch.as_str()),
        webhook_secret: config.webhook_secret.as_ref().map(|s| Arc::from(s.as_bytes())),
        process_deadline: Duration::from_secs(config.process_deadline_secs),
    };

    let app: Router = copier_web::webhook_routes::<WebState>(&config.webhook_path).with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, webhook_path = %config.webhook_path, "file-copier listening");
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

/// `file-copier check-config <path>`: runs the config loader against a
/// local directory and reports validation results without starting the web
/// server (§4.5).
pub async fn check_config(path: &Path) -> Result<()> {
    let root: PathBuf = if path.is_dir() { path.to_path_buf() } else { path.parent().unwrap_or(Path::new(".")).to_path_buf() };
    let main_doc_name = if path.is_dir() {
        "copier.yaml".to_string()
    } else {
        path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "copier.yaml".to_string())
    };

    // No real host calls are needed for a purely local check: every `$ref`
    // that escapes the local root is reported as a warning and skipped,
    // which is exactly the loader's documented per-reference failure policy
    // (§4.5 step 3g).
    let fake_host = Arc::new(copier_github::FakeHostClient::new());
    let placeholder_repo = RepoRef { owner: "local".to_string(), name: "config".to_string() };
    let loader = Loader::new(fake_host, placeholder_repo, "main".to_string()).with_local_root(root);

    match loader.load(&main_doc_name).await {
        Ok(config) => {
            println!("config OK: {} copy_rules, {} workflows", config.copy_rules.len(), config.workflows.len());
            Ok(())
        }
        Err(err) => {
            anyhow::bail!("config invalid: {err}");
        }
    }
}

/// `file-copier dry-run <path> <file>...`: exercises the matcher (L1/L5)
/// against a literal list of changed-file paths without touching any host,
/// printing what would be written and where. Useful for validating a rule's
/// patterns/transforms locally before wiring it to a live webhook.
pub async fn dry_run(config_path: &Path, files: &[String]) -> Result<()> {
    let root = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let main_doc_name =
        config_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "copier.yaml".to_string());

    let fake_host = Arc::new(copier_github::FakeHostClient::new());
    let placeholder_repo = RepoRef { owner: "local".to_string(), name: "config".to_string() };
    let loader = Loader::new(fake_host, placeholder_repo, "main".to_string()).with_local_root(root);
    let config = loader.load(&main_doc_name).await.context("loading config for dry-run")?;

    for rule in &config.copy_rules {
        for file in files {
            let result = pattern::match_path(file, &rule.source_pattern);
            if !result.matched {
                continue;
            }
            if pattern::is_excluded(file, &rule.source_pattern.exclude_patterns) {
                continue;
            }
            for target in &rule.targets {
                match copier_match::transform(file, &target.path_transform, &result.variables) {
                    Ok(dest) => println!("[{}] {file} -> {}:{} {dest}", rule.name, target.repo, target.branch),
                    Err(err) => println!("[{}] {file} -> {}: transform error: {err}", rule.name, target.repo),
                }
            }
        }
    }

    for workflow in &config.workflows {
        let (Some(transformations), Some(exclude)) =
            (workflow.transformations.resolved(), workflow.exclude.resolved())
        else {
            println!("[{}] skipped: unresolved $ref", workflow.name);
            continue;
        };
        for file in files {
            match copier_match::first_match(transformations, exclude, file) {
                Ok(Some((dest, _variables))) => println!(
                    "[{}] {file} -> {}:{} {dest}",
                    workflow.name, workflow.destination.repo, workflow.destination.branch
                ),
                Ok(None) => {}
                Err(err) => println!("[{}] {file}: transform error: {err}", workflow.name),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn check_config_accepts_a_valid_local_document() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("copier.yaml"),
            r#"
copy_rules:
  - name: sync-examples
    source_pattern:
      type: prefix
      pattern: examples/go/
    targets:
      - repo: acme/target
"#,
        )
        .unwrap();

        check_config(&temp.path().join("copier.yaml")).await.unwrap();
    }

    #[tokio::test]
    async fn check_config_rejects_an_empty_document() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("copier.yaml"), "copy_rules: []\nworkflows: []\n").unwrap();

        let err = check_config(&temp.path().join("copier.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("config invalid"));
    }

    #[tokio::test]
    async fn dry_run_prints_matched_destination_without_panicking() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("copier.yaml"),
            r#"
copy_rules:
  - name: sync-examples
    source_pattern:
      type: prefix
      pattern: examples/go/
    targets:
      - repo: acme/target
        path_transform: "docs/${relative_path}"
"#,
        )
        .unwrap();

        dry_run(&temp.path().join("copier.yaml"), &["examples/go/sub/b.go".to_string()])
            .await
            .unwrap();
    }
}
