//! The message templater (§4.3): commit message / PR title / PR body
//! rendering from a [`MessageContext`].

use std::collections::HashMap;

use regex::Regex;

/// Everything a commit message / PR title / PR body template may reference.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    pub rule_name: String,
    pub source_repo: String,
    pub source_branch: String,
    pub target_repo: String,
    pub target_branch: String,
    pub file_count: usize,
    pub pr_number: Option<u64>,
    pub commit_sha: Option<String>,
    pub variables: HashMap<String, String>,
}

impl MessageContext {
    fn builtin_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("rule_name".to_string(), self.rule_name.clone());
        map.insert("source_repo".to_string(), self.source_repo.clone());
        map.insert("source_branch".to_string(), self.source_branch.clone());
        map.insert("target_repo".to_string(), self.target_repo.clone());
        map.insert("target_branch".to_string(), self.target_branch.clone());
        map.insert("file_count".to_string(), self.file_count.to_string());
        if let Some(n) = self.pr_number {
            map.insert("pr_number".to_string(), n.to_string());
        }
        if let Some(sha) = &self.commit_sha {
            map.insert("commit_sha".to_string(), sha.clone());
        }
        map
    }
}

fn placeholder_re() -> Regex {
    Regex::new(r"\$\{([^}]*)\}").expect("static placeholder regex is valid")
}

/// Renders a template against the context's built-in variables first, then
/// its custom `variables`. Unlike the path transformer, unresolved
/// placeholders are left verbatim rather than erroring (§4.3).
pub fn render(template: &str, ctx: &MessageContext) -> String {
    let mut merged = ctx.builtin_map();
    for (key, value) in &ctx.variables {
        merged.insert(key.clone(), value.clone());
    }

    let re = placeholder_re();
    re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        merged.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// The default commit message when none is configured (§4.3).
pub fn default_commit_message(ctx: &MessageContext) -> String {
    format!("Update code examples from {}", ctx.source_repo)
}

/// The default PR title when none is configured: identical to the default
/// commit message (§4.3).
pub fn default_pr_title(ctx: &MessageContext) -> String {
    default_commit_message(ctx)
}

/// The default PR body when none is configured (§4.3).
pub fn default_pr_body(ctx: &MessageContext) -> String {
    format!(
        "Automated update of {} file(s) from {} (PR #{})",
        ctx.file_count,
        ctx.source_repo,
        ctx.pr_number.unwrap_or_default(),
    )
}

/// Renders a commit message, falling back to the documented default when
/// `template` is empty.
pub fn commit_message(template: &str, ctx: &MessageContext) -> String {
    if template.is_empty() {
        default_commit_message(ctx)
    } else {
        render(template, ctx)
    }
}

/// Renders a PR title, falling back to the documented default when
/// `template` is empty.
pub fn pr_title(template: &str, ctx: &MessageContext) -> String {
    if template.is_empty() {
        default_pr_title(ctx)
    } else {
        render(template, ctx)
    }
}

/// Renders a PR body, falling back to the documented default when
/// `template` is empty.
pub fn pr_body(template: &str, ctx: &MessageContext) -> String {
    if template.is_empty() {
        default_pr_body(ctx)
    } else {
        render(template, ctx)
    }
}
