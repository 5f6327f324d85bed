//! Git ref handling and build tag derivation

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of characters kept from a commit SHA
pub const SHORT_SHA_LEN: usize = 7;

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";

/// Errors raised while deriving tags from trigger inputs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    #[error("commit SHA is empty")]
    EmptySha,

    #[error("ref name is empty")]
    EmptyRef,

    #[error("ref '{0}' produces an empty branch tag")]
    EmptyTag(String),
}

/// A fully qualified git ref (e.g. `refs/heads/main`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitRef(String);

impl GitRef {
    /// Parse a ref, treating bare names as branches
    pub fn parse(raw: &str) -> Result<Self, RefError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RefError::EmptyRef);
        }

        if raw.starts_with("refs/") {
            Ok(Self(raw.to_string()))
        } else {
            Ok(Self(format!("{}{}", BRANCH_PREFIX, raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The short name without the `refs/heads/` or `refs/tags/` prefix
    pub fn short_name(&self) -> &str {
        self.0
            .strip_prefix(BRANCH_PREFIX)
            .or_else(|| self.0.strip_prefix(TAG_PREFIX))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inputs of a single pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Full commit SHA
    pub sha: String,

    /// Ref that triggered the run
    pub git_ref: GitRef,
}

impl Trigger {
    pub fn new(sha: &str, git_ref: &str) -> Result<Self, RefError> {
        let sha = sha.trim();
        if sha.is_empty() {
            return Err(RefError::EmptySha);
        }
        Ok(Self {
            sha: sha.to_string(),
            git_ref: GitRef::parse(git_ref)?,
        })
    }
}

/// Tags derived once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTags {
    pub short_sha: String,
    pub branch_tag: String,
}

impl BuildTags {
    pub fn derive(trigger: &Trigger) -> Result<Self, RefError> {
        Ok(Self {
            short_sha: short_sha(&trigger.sha)?,
            branch_tag: branch_tag(trigger.git_ref.as_str())?,
        })
    }
}

/// First seven characters of a commit SHA
///
/// SHAs shorter than seven characters are returned whole.
pub fn short_sha(sha: &str) -> Result<String, RefError> {
    let sha = sha.trim();
    if sha.is_empty() {
        return Err(RefError::EmptySha);
    }
    Ok(sha.chars().take(SHORT_SHA_LEN).collect())
}

/// Registry-safe tag for a ref: prefix stripped, `/` and `_` replaced by `-`
pub fn branch_tag(git_ref: &str) -> Result<String, RefError> {
    let parsed = GitRef::parse(git_ref)?;
    let tag: String = parsed
        .short_name()
        .chars()
        .map(|c| if c == '/' || c == '_' { '-' } else { c })
        .collect();

    if tag.is_empty() {
        return Err(RefError::EmptyTag(parsed.to_string()));
    }
    Ok(tag)
}

/// Docker tag grammar: `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`
pub fn is_valid_image_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() || first == '_' => {}
        _ => return false,
    }
    tag.len() <= 128
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
