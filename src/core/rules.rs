//! Environment selection rules

use crate::core::refs::GitRef;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Secret holding the production webhook URL
pub const PROD_WEBHOOK_SECRET: &str = "PROD_DEPLOY_WEBHOOK_URL";

/// Secret holding the development webhook URL
pub const DEV_WEBHOOK_SECRET: &str = "DEV_DEPLOY_WEBHOOK_URL";

/// Pattern for matching a ref (not serializable due to Regex)
#[derive(Debug, Clone)]
pub enum RefPattern {
    /// Full ref must be equal
    Exact(String),
    /// Regular expression match against the full ref
    Regex(Regex),
}

impl RefPattern {
    /// Check if the pattern matches the given ref
    pub fn matches(&self, git_ref: &GitRef) -> bool {
        match self {
            RefPattern::Exact(expected) => git_ref.as_str() == expected,
            RefPattern::Regex(regex) => regex.is_match(git_ref.as_str()),
        }
    }
}

/// Maps refs to a deployment environment
#[derive(Debug, Clone)]
pub struct EnvironmentRule {
    /// Environment label (e.g. `prod`)
    pub name: String,

    pub pattern: RefPattern,

    /// Name of the secret holding the webhook URL
    pub webhook_secret: String,
}

/// A resolved deployment target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub webhook_secret: String,
}

/// Pick the environment for a ref; the first matching rule wins
pub fn resolve_environment(rules: &[EnvironmentRule], git_ref: &GitRef) -> Option<Environment> {
    rules
        .iter()
        .find(|rule| rule.pattern.matches(git_ref))
        .map(|rule| Environment {
            name: rule.name.clone(),
            webhook_secret: rule.webhook_secret.clone(),
        })
}

/// `main` deploys to prod, `develop` deploys to dev
pub fn default_rules() -> Vec<EnvironmentRule> {
    vec![
        EnvironmentRule {
            name: "prod".to_string(),
            pattern: RefPattern::Exact("refs/heads/main".to_string()),
            webhook_secret: PROD_WEBHOOK_SECRET.to_string(),
        },
        EnvironmentRule {
            name: "dev".to_string(),
            pattern: RefPattern::Exact("refs/heads/develop".to_string()),
            webhook_secret: DEV_WEBHOOK_SECRET.to_string(),
        },
    ]
}
