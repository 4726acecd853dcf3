//! The transformation engine (§4.4): dispatches Move/Copy/Glob/Regex
//! transformations and selects the first match in declaration order.

use std::collections::HashMap;

use copier_types::Transformation;

use crate::error::TransformError;
use crate::pattern::{is_excluded, match_glob, match_regex, normalize_prefix};
use crate::path_transform::transform;

/// Applies a single transformation to `source_path`, returning the
/// destination path and any variables captured along the way (named regex
/// captures, or the glob's derived `relative_path`) if it matches.
pub fn apply(
    transformation: &Transformation,
    source_path: &str,
) -> Result<Option<(String, HashMap<String, String>)>, TransformError> {
    match transformation {
        Transformation::Move { from, to } => {
            Ok(apply_move(from, to, source_path).map(|dest| (dest, HashMap::new())))
        }
        Transformation::Copy { from, to } => {
            Ok(apply_copy(from, to, source_path).map(|dest| (dest, HashMap::new())))
        }
        Transformation::Glob { pattern, transform: tmpl } => apply_glob(pattern, tmpl, source_path),
        Transformation::Regex { pattern, transform: tmpl } => apply_regex(pattern, tmpl, source_path),
    }
}

/// `move{from, to}` (§4.4, §8 invariant 5): exact match on `from` maps to
/// `to`; `from/rel` maps to `to/rel`.
pub fn apply_move(from: &str, to: &str, source_path: &str) -> Option<String> {
    let from = normalize_prefix(from);
    let to = normalize_prefix(to);

    if source_path == from {
        return Some(to);
    }
    let prefix_with_slash = format!("{from}/");
    source_path
        .strip_prefix(prefix_with_slash.as_str())
        .map(|rel| format!("{to}/{rel}"))
}

/// `copy{from, to}`: exact match only (§4.4).
pub fn apply_copy(from: &str, to: &str, source_path: &str) -> Option<String> {
    if source_path == from {
        Some(to.to_string())
    } else {
        None
    }
}

/// `glob{pattern, transform}`: on match, derives `relative_path` from the
/// literal prefix before the pattern's first `**`, then runs the path
/// transformer (§4.4).
pub fn apply_glob(
    pattern: &str,
    tmpl: &str,
    source_path: &str,
) -> Result<Option<(String, HashMap<String, String>)>, TransformError> {
    let result = match_glob(source_path, pattern);
    if !result.matched {
        return Ok(None);
    }

    let prefix_len = pattern.find("**").unwrap_or(pattern.len());
    let prefix = &pattern[..prefix_len];
    let remainder = source_path.get(prefix.len()..).unwrap_or("");
    let relative_path = remainder.strip_prefix('/').unwrap_or(remainder);

    let mut variables: HashMap<String, String> = result.variables;
    variables.insert("relative_path".to_string(), relative_path.to_string());

    transform(source_path, tmpl, &variables).map(|dest| Some((dest, variables)))
}

/// `regex{pattern, transform}`: delegates to the pattern matcher, then runs
/// the path transformer with the captured variables (§4.4).
pub fn apply_regex(
    pattern: &str,
    tmpl: &str,
    source_path: &str,
) -> Result<Option<(String, HashMap<String, String>)>, TransformError> {
    let result = match_regex(source_path, pattern);
    if !result.matched {
        return Ok(None);
    }
    transform(source_path, tmpl, &result.variables).map(|dest| Some((dest, result.variables)))
}

/// Applies exclude patterns first, then scans `transformations` in
/// declaration order and returns the first match together with any
/// variables it captured (named regex captures, or a glob's
/// `relative_path`), so callers can surface them into message templates
/// (§4.4, §6, §9 "explicit first-match"). `None` means the file is skipped
/// (counts toward `files_skipped`).
pub fn first_match(
    transformations: &[Transformation],
    exclude_patterns: &[String],
    source_path: &str,
) -> Result<Option<(String, HashMap<String, String>)>, TransformError> {
    if is_excluded(source_path, exclude_patterns) {
        return Ok(None);
    }

    for transformation in transformations {
        if let Some(result) = apply(transformation, source_path)? {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_exact_match() {
        assert_eq!(
            apply_move("old/path", "new/path", "old/path"),
            Some("new/path".to_string())
        );
    }

    #[test]
    fn move_composes_relative_suffix() {
        assert_eq!(
            apply_move("old/path", "new/path", "old/path/sub/file.rs"),
            Some("new/path/sub/file.rs".to_string())
        );
    }

    #[test]
    fn move_normalizes_trailing_slash_on_to() {
        assert_eq!(
            apply_move("old", "new/", "old/file.rs"),
            Some("new/file.rs".to_string())
        );
    }

    #[test]
    fn move_does_not_match_unrelated_path() {
        assert_eq!(apply_move("old/path", "new/path", "other/path"), None);
    }

    #[test]
    fn copy_matches_only_exact_path() {
        assert_eq!(
            apply_copy("a/b.txt", "c/d.txt", "a/b.txt"),
            Some("c/d.txt".to_string())
        );
        assert_eq!(apply_copy("a/b.txt", "c/d.txt", "a/b/c.txt"), None);
    }

    #[test]
    fn glob_derives_relative_path_from_first_doublestar() {
        let (dest, variables) =
            apply_glob("examples/**/*.go", "code/${relative_path}", "examples/go/sub/b.go")
                .unwrap()
                .unwrap();
        assert_eq!(dest, "code/go/sub/b.go");
        assert_eq!(variables["relative_path"], "go/sub/b.go");
    }

    #[test]
    fn regex_delegates_to_path_transformer() {
        let (dest, variables) = apply_regex(
            r"^examples/(?P<lang>[^/]+)/(?P<rest>.+)$",
            "code/${lang}/${rest}",
            "examples/py/x.py",
        )
        .unwrap()
        .unwrap();
        assert_eq!(dest, "code/py/x.py");
        assert_eq!(variables["lang"], "py");
        assert_eq!(variables["rest"], "x.py");
    }

    #[test]
    fn first_match_wins_in_declaration_order() {
        let transformations = vec![
            Transformation::Move {
                from: "a".to_string(),
                to: "first".to_string(),
            },
            Transformation::Move {
                from: "a".to_string(),
                to: "second".to_string(),
            },
        ];
        let (dest, _) = first_match(&transformations, &[], "a").unwrap().unwrap();
        assert_eq!(dest, "first");
    }

    #[test]
    fn first_match_surfaces_captured_variables() {
        let transformations = vec![Transformation::Regex {
            pattern: r"^examples/(?P<lang>[^/]+)/(?P<rest>.+)$".to_string(),
            transform: "code/${lang}/${rest}".to_string(),
        }];
        let (dest, variables) = first_match(&transformations, &[], "examples/py/x.py")
            .unwrap()
            .unwrap();
        assert_eq!(dest, "code/py/x.py");
        assert_eq!(variables["lang"], "py");
    }

    #[test]
    fn first_match_respects_excludes() {
        let transformations = vec![Transformation::Move {
            from: "a".to_string(),
            to: "b".to_string(),
        }];
        let dest = first_match(&transformations, &["^a$".to_string()], "a").unwrap();
        assert!(dest.is_none());
    }

    #[test]
    fn no_transformation_matches_is_a_skip_not_an_error() {
        let dest = first_match(&[], &[], "unrelated.txt").unwrap();
        assert!(dest.is_none());
    }
}
