//! The result of matching a file path against a pattern (§3 MatchResult).

use std::collections::HashMap;

/// Outcome of a pattern match, carrying any variables extracted for the
/// path transformer / message templater.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub variables: HashMap<String, String>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched(variables: HashMap<String, String>) -> Self {
        Self {
            matched: true,
            variables,
        }
    }
}
