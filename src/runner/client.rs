//! Runner configuration

use crate::core::config::PipelineConfig;

/// Configuration for the external tool clients
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the docker executable
    ///
    /// If not provided, defaults to "docker" (assumes it's on PATH).
    pub docker_path: Option<String>,

    /// Timeout for webhook requests in seconds
    pub http_timeout_secs: u64,

    /// User agent sent with webhook requests
    pub user_agent: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            docker_path: None,
            http_timeout_secs: 30,
            user_agent: format!("shipline/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docker_path(mut self, docker_path: String) -> Self {
        self.docker_path = Some(docker_path);
        self
    }

    pub fn with_http_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout_secs = timeout_secs;
        self
    }

    pub fn docker_path(&self) -> &str {
        self.docker_path.as_deref().unwrap_or("docker")
    }

    /// Runner settings for a pipeline; webhook requests get the deploy stage's time budget
    pub fn for_pipeline(config: &PipelineConfig, docker_path: String) -> Self {
        Self::new()
            .with_docker_path(docker_path)
            .with_http_timeout(config.deploy.timeout_secs)
    }
}
