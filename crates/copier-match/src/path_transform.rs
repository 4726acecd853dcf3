//! The path transformer (§4.2): `${var}` substitution with built-ins.

use std::collections::HashMap;

use regex::Regex;

use crate::error::TransformError;

fn placeholder_re() -> Regex {
    Regex::new(r"\$\{([^}]*)\}").expect("static placeholder regex is valid")
}

/// Computes the built-in variables for `source_path`: `path`, `dir`,
/// `filename`, `ext` (§4.2).
pub fn builtin_variables(source_path: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    let dir = match source_path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    };
    let filename = source_path
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(source_path)
        .to_string();
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default();

    vars.insert("path".to_string(), source_path.to_string());
    vars.insert("dir".to_string(), dir);
    vars.insert("filename".to_string(), filename);
    vars.insert("ext".to_string(), ext);
    vars
}

/// Renders `template` by substituting `${name}` for the value of `name` in
/// `variables`, with built-ins for `source_path` injected first at lowest
/// precedence (§4.2, §8 invariant 4).
///
/// An empty template returns the empty string unconditionally: callers
/// (the loader) are responsible for substituting the legacy `${path}`
/// default before calling this function.
pub fn transform(
    source_path: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TransformError> {
    if template.is_empty() {
        return Ok(String::new());
    }

    let mut merged = builtin_variables(source_path);
    for (key, value) in variables {
        merged.insert(key.clone(), value.clone());
    }

    let re = placeholder_re();
    let rendered = re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        merged.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
    });

    let residual: Vec<String> = re
        .captures_iter(&rendered)
        .map(|c| c[1].to_string())
        .collect();

    if residual.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(TransformError::UnreplacedVariables(residual))
    }
}
