//! Dry-run runner: logs what would happen, touches nothing

use crate::runner::{
    BuildReport, BuildRequest, DockerBuildx, ImageBuilder, RegistryLogin, RunnerError,
    WebhookDispatcher, WebhookResponse,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct DryRun;

#[async_trait]
impl ImageBuilder for DryRun {
    async fn login(&self, login: &RegistryLogin) -> Result<(), RunnerError> {
        info!("[dry-run] docker {}", DockerBuildx::login_args(login).join(" "));
        Ok(())
    }

    async fn build_and_push(&self, request: &BuildRequest) -> Result<BuildReport, RunnerError> {
        info!("[dry-run] docker {}", DockerBuildx::build_args(request).join(" "));
        Ok(BuildReport {
            tags: request.tags.clone(),
            pushed: false,
        })
    }
}

#[async_trait]
impl WebhookDispatcher for DryRun {
    async fn dispatch(&self, _url: &str, payload: &Value) -> Result<WebhookResponse, RunnerError> {
        info!("[dry-run] POST <webhook> {}", payload);
        Ok(WebhookResponse {
            status: 200,
            body: String::new(),
        })
    }
}
