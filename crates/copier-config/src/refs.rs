//! `$ref` target parsing (§4.5 step 3f).
//!
//! A relative path (no scheme) resolves against the directory of the
//! referencing workflow document, in the same repo/branch. A
//! `repo://owner/name/path/to/file@branch` reference (branch defaults to
//! `main`) is fetched from the named repository.

use copier_types::{RepoRef, RepoRefError};

use crate::error::ConfigError;

/// A fully-resolved `$ref` target: where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub repo: RepoRef,
    pub branch: String,
    pub path: String,
}

/// Resolves a raw `$ref` string against the document it appeared in.
pub fn resolve(
    raw: &str,
    current_repo: &RepoRef,
    current_branch: &str,
    current_doc_path: &str,
) -> Result<ResolvedRef, ConfigError> {
    if let Some(rest) = raw.strip_prefix("repo://") {
        parse_repo_scheme(rest, raw)
    } else {
        let dir = dirname(current_doc_path);
        let path = join(&dir, raw);
        Ok(ResolvedRef {
            repo: current_repo.clone(),
            branch: current_branch.to_string(),
            path,
        })
    }
}

fn parse_repo_scheme(rest: &str, raw: &str) -> Result<ResolvedRef, ConfigError> {
    let (repo_and_path, branch) = match rest.rsplit_once('@') {
        Some((left, right)) => (left, right.to_string()),
        None => (rest, "main".to_string()),
    };

    let mut parts = repo_and_path.splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty());
    let name = parts.next().filter(|s| !s.is_empty());
    let path = parts.next().filter(|s| !s.is_empty());

    match (owner, name, path) {
        (Some(owner), Some(name), Some(path)) => Ok(ResolvedRef {
            repo: RepoRef {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            branch,
            path: path.to_string(),
        }),
        _ => Err(ConfigError::MalformedRef(raw.to_string())),
    }
}

fn dirname(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

fn join(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        rel.to_string()
    } else {
        format!("{dir}/{rel}")
    }
}

impl From<RepoRefError> for ConfigError {
    fn from(err: RepoRefError) -> Self {
        ConfigError::MalformedRef(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(owner: &str, name: &str) -> RepoRef {
        RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn relative_ref_resolves_against_document_directory() {
        let resolved = resolve(
            "strategies/pr.yaml",
            &repo("acme", "src"),
            "main",
            "workflows/examples.yaml",
        )
        .unwrap();
        assert_eq!(resolved.repo, repo("acme", "src"));
        assert_eq!(resolved.branch, "main");
        assert_eq!(resolved.path, "workflows/strategies/pr.yaml");
    }

    #[test]
    fn relative_ref_at_document_root_has_no_directory_prefix() {
        let resolved = resolve("pr.yaml", &repo("acme", "src"), "main", "workflows.yaml").unwrap();
        assert_eq!(resolved.path, "pr.yaml");
    }

    #[test]
    fn repo_scheme_parses_owner_name_path_and_branch() {
        let resolved = resolve(
            "repo://acme/shared/strategies/pr.yaml@develop",
            &repo("acme", "src"),
            "main",
            "workflows.yaml",
        )
        .unwrap();
        assert_eq!(resolved.repo, repo("acme", "shared"));
        assert_eq!(resolved.branch, "develop");
        assert_eq!(resolved.path, "strategies/pr.yaml");
    }

    #[test]
    fn repo_scheme_defaults_branch_to_main() {
        let resolved = resolve(
            "repo://acme/shared/pr.yaml",
            &repo("acme", "src"),
            "main",
            "workflows.yaml",
        )
        .unwrap();
        assert_eq!(resolved.branch, "main");
    }

    #[test]
    fn malformed_repo_scheme_is_an_error() {
        assert!(resolve("repo://acme", &repo("acme", "src"), "main", "w.yaml").is_err());
    }
}
