//! Docker Buildx client - drives the docker CLI as a subprocess

use crate::runner::{BuildReport, BuildRequest, ImageBuilder, RegistryLogin, RunnerError};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Builds and pushes images with `docker buildx`
#[derive(Debug, Clone)]
pub struct DockerBuildx {
    /// Path to docker executable
    docker_path: String,
}

impl DockerBuildx {
    /// Create a new client
    ///
    /// # Arguments
    /// * `docker_path` - Path to docker executable (e.g., "docker", "/usr/bin/docker")
    pub fn new(docker_path: String) -> Self {
        Self { docker_path }
    }

    /// Arguments for `docker login`; the password goes through stdin
    pub fn login_args(login: &RegistryLogin) -> Vec<String> {
        let mut args = vec!["login".to_string()];
        if let Some(registry) = &login.registry {
            args.push(registry.clone());
        }
        args.extend([
            "--username".to_string(),
            login.username.clone(),
            "--password-stdin".to_string(),
        ]);
        args
    }

    /// Arguments for `docker buildx build`
    pub fn build_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec!["buildx".to_string(), "build".to_string()];

        if !request.platforms.is_empty() {
            args.push("--platform".to_string());
            args.push(request.platforms.join(","));
        }

        for (key, value) in &request.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }

        for tag in &request.tags {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }

        args.push("--file".to_string());
        args.push(request.dockerfile.clone());
        args.push(if request.push { "--push" } else { "--load" }.to_string());
        args.push(request.context.clone());
        args
    }

    fn check_status(&self, output: Output) -> Result<Output, RunnerError> {
        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);
        warn!("{} exited with code {}: {}", self.docker_path, code, stderr);
        Err(RunnerError::CommandFailed {
            program: self.docker_path.clone(),
            code,
            stderr,
        })
    }

    fn spawn_error(&self, e: std::io::Error) -> RunnerError {
        RunnerError::Spawn {
            program: self.docker_path.clone(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl ImageBuilder for DockerBuildx {
    async fn login(&self, login: &RegistryLogin) -> Result<(), RunnerError> {
        info!(
            "Logging in to {} as {}",
            login.registry.as_deref().unwrap_or("default registry"),
            login.username
        );

        let mut child = Command::new(&self.docker_path)
            .args(Self::login_args(login))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(login.password.as_bytes())
                .await
                .map_err(|e| RunnerError::Internal(format!("Failed to send password: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        self.check_status(output)?;

        Ok(())
    }

    async fn build_and_push(&self, request: &BuildRequest) -> Result<BuildReport, RunnerError> {
        let args = Self::build_args(request);
        debug!("Running {} {}", self.docker_path, args.join(" "));

        let output = Command::new(&self.docker_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        self.check_status(output)?;

        info!(
            "Built {} tag(s){}",
            request.tags.len(),
            if request.push { " and pushed" } else { "" }
        );

        Ok(BuildReport {
            tags: request.tags.clone(),
            pushed: request.push,
        })
    }
}
