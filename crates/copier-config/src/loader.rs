//! The config loader orchestration (§4.5): read, parse, expand `$ref`s,
//! merge defaults, and validate.

use std::path::PathBuf;
use std::sync::Arc;

use copier_github::HostClient;
use copier_types::{
    CommitStrategyField, Config, ExcludeField, RepoRef, TransformationsField, Workflow,
};

use crate::defaults;
use crate::error::ConfigError;
use crate::main_doc::{EntrySourceKind, MainDocument, WorkflowConfigEntry};
use crate::refs::{self, ResolvedRef};
use crate::validate;
use crate::workflow_doc::WorkflowDocument;

/// Loads and merges a main configuration document into a final [`Config`].
///
/// Reads the main document from `local_root` when present (falling back to
/// the host API), and every other reference strictly through the host API,
/// since `local_root` only ever represents the main document's own
/// filesystem location (§4.5 step 1: "local filesystem first, then remote
/// config repository").
pub struct Loader {
    host: Arc<dyn HostClient>,
    config_repo: RepoRef,
    config_branch: String,
    local_root: Option<PathBuf>,
}

impl Loader {
    pub fn new(host: Arc<dyn HostClient>, config_repo: RepoRef, config_branch: String) -> Self {
        Self {
            host,
            config_repo,
            config_branch,
            local_root: None,
        }
    }

    pub fn with_local_root(mut self, root: PathBuf) -> Self {
        self.local_root = Some(root);
        self
    }

    pub async fn load(&self, main_doc_path: &str) -> Result<Config, ConfigError> {
        let (text, _) = self.read_main_document(main_doc_path).await?;
        let main_doc: MainDocument =
            serde_yaml::from_str(&text).map_err(ConfigError::MalformedMainDocument)?;

        if main_doc.is_empty() {
            return Err(ConfigError::NoUsableEntries);
        }

        let mut workflows = main_doc.workflows.clone();
        let copy_rules = main_doc.copy_rules.clone();

        for entry in &main_doc.workflow_configs {
            if !entry.enabled {
                tracing::info!(source = ?entry.source, "skipping disabled workflow_configs entry");
                continue;
            }
            match self.resolve_entry(entry, &main_doc, main_doc_path).await {
                Ok(mut resolved) => workflows.append(&mut resolved),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping workflow_configs entry");
                }
            }
        }

        let merged = Config {
            source_repo: main_doc.source_repo.clone(),
            source_branch: main_doc.source_branch.clone(),
            batch_by_repo: main_doc.batch_by_repo,
            batch_pr_config: main_doc.batch_pr_config.clone(),
            defaults: main_doc.defaults.clone(),
            copy_rules,
            workflows,
        };

        validate::validate(merged)
    }

    async fn resolve_entry(
        &self,
        entry: &WorkflowConfigEntry,
        main_doc: &MainDocument,
        main_doc_path: &str,
    ) -> Result<Vec<Workflow>, ConfigError> {
        let (raw_workflows, doc_repo, doc_branch, doc_path, doc_defaults) = match entry.source {
            EntrySourceKind::Inline => {
                let workflows = entry
                    .workflows
                    .clone()
                    .ok_or_else(|| ConfigError::MalformedRef("inline entry has no workflows".into()))?;
                (
                    workflows,
                    self.config_repo.clone(),
                    self.config_branch.clone(),
                    main_doc_path.to_string(),
                    None,
                )
            }
            EntrySourceKind::Local => {
                let path = entry
                    .path
                    .clone()
                    .ok_or_else(|| ConfigError::MalformedRef("local entry has no path".into()))?;
                let text = self
                    .read_document(&self.config_repo.clone(), &self.config_branch.clone(), &path)
                    .await?;
                let doc: WorkflowDocument =
                    serde_yaml::from_str(&text).map_err(ConfigError::MalformedWorkflowDocument)?;
                let repo = doc
                    .source_repo
                    .as_deref()
                    .and_then(|s| RepoRef::parse(s).ok())
                    .unwrap_or_else(|| self.config_repo.clone());
                let branch = doc
                    .source_branch
                    .clone()
                    .unwrap_or_else(|| self.config_branch.clone());
                (doc.workflows.clone(), repo, branch, path, doc.defaults.clone())
            }
            EntrySourceKind::Repo => {
                let repo = entry
                    .repo
                    .clone()
                    .ok_or_else(|| ConfigError::MalformedRef("repo entry has no repo".into()))?;
                let path = entry
                    .path
                    .clone()
                    .ok_or_else(|| ConfigError::MalformedRef("repo entry has no path".into()))?;
                let branch = entry.branch.clone().unwrap_or_else(|| "main".to_string());
                let text = self.read_document(&repo, &branch, &path).await?;
                let doc: WorkflowDocument =
                    serde_yaml::from_str(&text).map_err(ConfigError::MalformedWorkflowDocument)?;
                let doc_repo = doc
                    .source_repo
                    .as_deref()
                    .and_then(|s| RepoRef::parse(s).ok())
                    .unwrap_or_else(|| repo.clone());
                let doc_branch = doc.source_branch.clone().unwrap_or_else(|| branch.clone());
                (doc.workflows.clone(), doc_repo, doc_branch, path, doc.defaults.clone())
            }
        };

        let mut resolved = Vec::with_capacity(raw_workflows.len());
        for workflow in raw_workflows {
            match self
                .resolve_workflow(workflow, &doc_repo, &doc_branch, &doc_path, doc_defaults.as_ref(), main_doc)
                .await
            {
                Ok(w) => resolved.push(w),
                Err(err) => tracing::warn!(error = %err, "skipping workflow"),
            }
        }
        Ok(resolved)
    }

    async fn resolve_workflow(
        &self,
        mut workflow: Workflow,
        doc_repo: &RepoRef,
        doc_branch: &str,
        doc_path: &str,
        doc_defaults: Option<&copier_types::Defaults>,
        main_doc: &MainDocument,
    ) -> Result<Workflow, ConfigError> {
        if workflow.source.repo.is_none() {
            workflow.source.repo = Some(doc_repo.clone());
        }
        if workflow.source.branch.is_none() {
            workflow.source.branch = Some(doc_branch.to_string());
        }

        let merged_defaults = defaults::merge(&[
            workflow.defaults.as_ref(),
            doc_defaults,
            main_doc.defaults.as_ref(),
        ]);

        if workflow.commit_strategy.is_none() {
            if let Some(cs) = merged_defaults.commit_strategy.clone() {
                workflow.commit_strategy = Some(CommitStrategyField::Inline(cs));
            }
        }
        if matches!(workflow.exclude.resolved(), Some([])) && !merged_defaults.exclude.is_empty() {
            workflow.exclude = ExcludeField::Inline(merged_defaults.exclude.clone());
        }

        workflow.transformations = match workflow.transformations {
            TransformationsField::Ref(spec) => {
                let resolved = refs::resolve(&spec.r#ref, doc_repo, doc_branch, doc_path)?;
                let text = self.fetch(&resolved).await?;
                let list = serde_yaml::from_str(&text).map_err(ConfigError::MalformedWorkflowDocument)?;
                TransformationsField::Inline(list)
            }
            inline => inline,
        };

        workflow.exclude = match workflow.exclude {
            ExcludeField::Ref(spec) => {
                let resolved = refs::resolve(&spec.r#ref, doc_repo, doc_branch, doc_path)?;
                let text = self.fetch(&resolved).await?;
                let list = serde_yaml::from_str(&text).map_err(ConfigError::MalformedWorkflowDocument)?;
                ExcludeField::Inline(list)
            }
            inline => inline,
        };

        workflow.commit_strategy = match workflow.commit_strategy {
            Some(CommitStrategyField::Ref(spec)) => {
                let resolved = refs::resolve(&spec.r#ref, doc_repo, doc_branch, doc_path)?;
                let text = self.fetch(&resolved).await?;
                let cfg = serde_yaml::from_str(&text).map_err(ConfigError::MalformedWorkflowDocument)?;
                Some(CommitStrategyField::Inline(cfg))
            }
            other => other,
        };

        validate::validate_workflow(&workflow)?;
        Ok(workflow)
    }

    async fn fetch(&self, target: &ResolvedRef) -> Result<String, ConfigError> {
        self.read_document(&target.repo, &target.branch, &target.path).await
    }

    async fn read_main_document(&self, path: &str) -> Result<(String, String), ConfigError> {
        if let Some(root) = &self.local_root {
            let full = root.join(path);
            if let Ok(bytes) = tokio::fs::read(&full).await {
                let text = String::from_utf8(bytes).map_err(|_| ConfigError::InvalidUtf8(path.to_string()))?;
                return Ok((text, path.to_string()));
            }
        }
        let bytes = self
            .host
            .get_content(&self.config_repo, path, &self.config_branch)
            .await
            .map_err(|source| ConfigError::Host {
                repo: self.config_repo.to_string(),
                path: path.to_string(),
                source,
            })?
            .ok_or(ConfigError::MainDocumentUnreadable)?;
        let text = String::from_utf8(bytes).map_err(|_| ConfigError::InvalidUtf8(path.to_string()))?;
        Ok((text, path.to_string()))
    }

    async fn read_document(&self, repo: &RepoRef, branch: &str, path: &str) -> Result<String, ConfigError> {
        if let Some(root) = &self.local_root {
            if repo == &self.config_repo && branch == self.config_branch {
                let full = root.join(path);
                if let Ok(bytes) = tokio::fs::read(&full).await {
                    return String::from_utf8(bytes)
                        .map_err(|_| ConfigError::InvalidUtf8(path.to_string()));
                }
            }
        }
        let bytes = self
            .host
            .get_content(repo, path, branch)
            .await
            .map_err(|source| ConfigError::Host {
                repo: repo.to_string(),
                path: path.to_string(),
                source,
            })?
            .ok_or_else(|| ConfigError::Io {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })?;
        String::from_utf8(bytes).map_err(|_| ConfigError::InvalidUtf8(path.to_string()))
    }
}
