//! Repository references in `owner/name` form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GitHub repository reference, always `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(s: &str) -> Result<Self, RepoRefError> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| RepoRefError::Malformed(s.to_string()))?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(RepoRefError::Malformed(s.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl TryFrom<String> for RepoRef {
    type Error = RepoRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoRef> for String {
    fn from(value: RepoRef) -> Self {
        value.as_key()
    }
}

/// Error parsing a repository reference.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoRefError {
    #[error("repository reference '{0}' is not of the form owner/name")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_name() {
        let r = RepoRef::parse("acme/widgets").unwrap();
        assert_eq!(r.owner, "acme");
        assert_eq!(r.name, "widgets");
        assert_eq!(r.as_key(), "acme/widgets");
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(RepoRef::parse("acme").is_err());
    }

    #[test]
    fn rejects_extra_slash() {
        assert!(RepoRef::parse("acme/widgets/extra").is_err());
    }
}
