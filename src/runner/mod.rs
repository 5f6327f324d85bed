//! Clients for the external tools a run drives: docker and the deploy webhook

pub mod client;
pub mod docker;
pub mod dry_run;
pub mod response;
pub mod secrets;
pub mod webhook;

use async_trait::async_trait;
use serde_json::Value;

pub use client::RunnerConfig;
pub use docker::DockerBuildx;
pub use dry_run::DryRun;
pub use response::{BuildReport, BuildRequest, RegistryLogin, RunnerError, WebhookResponse};
pub use secrets::Secrets;
pub use webhook::HttpWebhook;

/// Trait for image building - allows for different implementations
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Authenticate against a registry
    async fn login(&self, login: &RegistryLogin) -> Result<(), RunnerError>;

    /// Build the image and push (or load) every tag
    async fn build_and_push(&self, request: &BuildRequest) -> Result<BuildReport, RunnerError>;
}

/// Trait for webhook delivery
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    /// POST the payload to the URL
    async fn dispatch(&self, url: &str, payload: &Value) -> Result<WebhookResponse, RunnerError>;
}
