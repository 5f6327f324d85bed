//! Runner request, response and error types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error types for external tool operations
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with code {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("webhook returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("missing secret {0}")]
    MissingSecret(String),

    #[error("invalid image tag '{0}'")]
    InvalidTag(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Credential for `docker login`
#[derive(Clone)]
pub struct RegistryLogin {
    /// Registry host; `None` logs in to the default registry
    pub registry: Option<String>,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryLogin")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything needed for one `docker buildx build`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub context: String,
    pub dockerfile: String,

    /// Full image references (`image:tag`)
    pub tags: Vec<String>,

    pub platforms: Vec<String>,
    pub build_args: BTreeMap<String, String>,
    pub push: bool,
}

/// Outcome of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// References that were built
    pub tags: Vec<String>,

    /// Whether they were pushed to the registry
    pub pushed: bool,
}

/// Response from a webhook endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}
