//! The pattern matcher (§4.1): prefix/glob/regex matching, variable
//! extraction, and exclude-pattern suppression.

use std::collections::HashMap;

use copier_types::{MatchResult, PatternType, SourcePattern};
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::error::MatchError;

/// Matches `file_path` against `pattern`, applying the exclude pass
/// afterward (§4.1's "Exclude pass").
pub fn match_path(file_path: &str, pattern: &SourcePattern) -> MatchResult {
    let primary = match pattern.pattern_type {
        PatternType::Prefix => match_prefix(file_path, &pattern.pattern),
        PatternType::Glob => match_glob(file_path, &pattern.pattern),
        PatternType::Regex => match_regex(file_path, &pattern.pattern),
    };

    if !primary.matched {
        return primary;
    }

    if is_excluded(file_path, &pattern.exclude_patterns) {
        return MatchResult::no_match();
    }

    primary
}

/// prefix match: the pattern's trailing `/` is stripped; an empty prefix
/// matches every path (§4.1, §8 invariant 1).
pub fn match_prefix(file_path: &str, pattern: &str) -> MatchResult {
    let prefix = normalize_prefix(pattern);

    if prefix.is_empty() {
        let mut variables = HashMap::new();
        variables.insert("matched_prefix".to_string(), prefix.clone());
        variables.insert("relative_path".to_string(), file_path.to_string());
        return MatchResult::matched(variables);
    }

    let Some(suffix) = file_path.strip_prefix(prefix.as_str()) else {
        return MatchResult::no_match();
    };
    // Only a real segment boundary counts as a prefix match: "foo" must not
    // match "foobar".
    if !suffix.is_empty() && !suffix.starts_with('/') {
        return MatchResult::no_match();
    }

    let relative = suffix.strip_prefix('/').unwrap_or(suffix);
    let mut variables = HashMap::new();
    variables.insert("matched_prefix".to_string(), prefix);
    variables.insert("relative_path".to_string(), relative.to_string());
    MatchResult::matched(variables)
}

/// Strips a single trailing `/` from a prefix/move-target pattern.
pub fn normalize_prefix(pattern: &str) -> String {
    pattern.strip_suffix('/').unwrap_or(pattern).to_string()
}

/// glob match with doublestar (`**`) semantics: `*` within a segment, `?`
/// one character, `**` any number of segments. Falls back to a simple
/// segment-only comparison if the evaluator itself errors (§4.1).
pub fn match_glob(file_path: &str, pattern: &str) -> MatchResult {
    match build_glob(pattern) {
        Ok(matcher) => {
            if matcher.is_match(file_path) {
                let mut variables = HashMap::new();
                variables.insert("matched_pattern".to_string(), pattern.to_string());
                MatchResult::matched(variables)
            } else {
                MatchResult::no_match()
            }
        }
        Err(err) => {
            tracing::warn!(pattern, error = %err, "glob pattern failed to compile, falling back to segment match");
            if fallback_segment_match(file_path, pattern) {
                let mut variables = HashMap::new();
                variables.insert("matched_pattern".to_string(), pattern.to_string());
                MatchResult::matched(variables)
            } else {
                MatchResult::no_match()
            }
        }
    }
}

fn build_glob(pattern: &str) -> Result<GlobMatcher, MatchError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|source| MatchError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

/// A last-resort matcher used only when the doublestar evaluator itself
/// errors: literal segments (ignoring `*`/`**`/`?` segments) must appear,
/// in order, as a subsequence of the path's segments.
fn fallback_segment_match(file_path: &str, pattern: &str) -> bool {
    let path_segments: Vec<&str> = file_path.split('/').collect();
    let literal_segments: Vec<&str> = pattern
        .split('/')
        .filter(|seg| !seg.contains('*') && !seg.contains('?'))
        .collect();

    let mut path_idx = 0;
    for lit in literal_segments {
        match path_segments[path_idx..].iter().position(|s| *s == lit) {
            Some(offset) => path_idx += offset + 1,
            None => return false,
        }
    }
    true
}

/// regex match: every named capture group populates `variables`; unnamed
/// groups are discarded (§4.1, §8 invariant 2). Compile failure is not
/// fatal — it surfaces as a no-match plus a warning.
pub fn match_regex(file_path: &str, pattern: &str) -> MatchResult {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid regex pattern, skipping match");
            return MatchResult::no_match();
        }
    };

    let Some(captures) = re.captures(file_path) else {
        return MatchResult::no_match();
    };

    let mut variables = HashMap::new();
    for name in re.capture_names().flatten() {
        if let Some(value) = captures.name(name) {
            variables.insert(name.to_string(), value.as_str().to_string());
        }
    }
    MatchResult::matched(variables)
}

/// True iff any exclude pattern matches `file_path`. Invalid patterns are
/// skipped silently — validation is the loader's job (§4.1).
pub fn is_excluded(file_path: &str, exclude_patterns: &[String]) -> bool {
    exclude_patterns.iter().any(|pattern| match Regex::new(pattern) {
        Ok(re) => re.is_match(file_path),
        Err(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_strips_trailing_slash_and_extracts_relative_path() {
        let m = match_prefix("examples/go/sub/b.go", "examples/go/");
        assert!(m.matched);
        assert_eq!(m.variables["matched_prefix"], "examples/go");
        assert_eq!(m.variables["relative_path"], "sub/b.go");
    }

    #[test]
    fn prefix_does_not_match_partial_segment() {
        let m = match_prefix("examples/gorilla/a.go", "examples/go");
        assert!(!m.matched);
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let m = match_prefix("any/path.txt", "");
        assert!(m.matched);
        assert_eq!(m.variables["relative_path"], "any/path.txt");
    }

    #[test]
    fn glob_doublestar_crosses_segments() {
        let m = match_glob("examples/go/sub/b.go", "examples/**/*.go");
        assert!(m.matched);
    }

    #[test]
    fn glob_single_star_stays_in_segment() {
        let m = match_glob("examples/go/sub/b.go", "examples/*.go");
        assert!(!m.matched);
    }

    #[test]
    fn regex_named_captures_populate_variables() {
        let m = match_regex("examples/py/x.py", r"^examples/(?P<lang>[^/]+)/(?P<rest>.+)$");
        assert!(m.matched);
        assert_eq!(m.variables["lang"], "py");
        assert_eq!(m.variables["rest"], "x.py");
    }

    #[test]
    fn regex_unnamed_groups_are_discarded() {
        let m = match_regex("examples/py/x.py", r"^examples/([^/]+)/(.+)$");
        assert!(m.matched);
        assert!(m.variables.is_empty());
    }

    #[test]
    fn exclude_suppresses_an_otherwise_matching_path() {
        let pattern = SourcePattern {
            pattern_type: PatternType::Prefix,
            pattern: "examples/".to_string(),
            exclude_patterns: vec![r"\.test\.go$".to_string()],
        };
        let m = match_path("examples/go/a_test.go", &pattern);
        assert!(!m.matched);
        assert!(m.variables.is_empty());
    }

    #[test]
    fn invalid_exclude_pattern_is_skipped_not_fatal() {
        assert!(!is_excluded("a.txt", &["[".to_string()]));
    }
}
