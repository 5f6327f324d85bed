//! Test utility functions for shipline scenarios

use async_trait::async_trait;
use serde_json::Value;
use shipline::core::config::PipelineConfig;
use shipline::core::{ExecutionStatus, Pipeline, StageState, Trigger};
use shipline::execution::{ExecutionEngine, ExecutionError, ExecutionEvent, StageExecutor};
use shipline::runner::{
    BuildReport, BuildRequest, ImageBuilder, RegistryLogin, RunnerError, Secrets,
    WebhookDispatcher, WebhookResponse,
};
use std::sync::{Arc, Mutex};

pub const SHA: &str = "abcdef1234567890";

/// Builder that records requests and optionally fails
#[derive(Clone, Default)]
pub struct MockBuilder {
    pub logins: Arc<Mutex<Vec<RegistryLogin>>>,
    pub builds: Arc<Mutex<Vec<BuildRequest>>>,
    fail_with: Option<String>,
}

impl MockBuilder {
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageBuilder for MockBuilder {
    async fn login(&self, login: &RegistryLogin) -> Result<(), RunnerError> {
        self.logins.lock().unwrap().push(login.clone());
        Ok(())
    }

    async fn build_and_push(&self, request: &BuildRequest) -> Result<BuildReport, RunnerError> {
        self.builds.lock().unwrap().push(request.clone());
        if let Some(stderr) = &self.fail_with {
            return Err(RunnerError::CommandFailed {
                program: "docker".to_string(),
                code: 1,
                stderr: stderr.clone(),
            });
        }
        Ok(BuildReport {
            tags: request.tags.clone(),
            pushed: request.push,
        })
    }
}

/// Webhook that records calls and answers with a fixed status
#[derive(Clone)]
pub struct MockWebhook {
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    status: u16,
}

impl MockWebhook {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            status,
        }
    }
}

#[async_trait]
impl WebhookDispatcher for MockWebhook {
    async fn dispatch(&self, url: &str, payload: &Value) -> Result<WebhookResponse, RunnerError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        if !(200..300).contains(&self.status) {
            return Err(RunnerError::HttpStatus {
                status: self.status,
                body: "rejected".to_string(),
            });
        }
        Ok(WebhookResponse {
            status: self.status,
            body: String::new(),
        })
    }
}

/// Both webhook secrets set to recognizable URLs
pub fn webhook_secrets() -> Secrets {
    Secrets::new()
        .with("PROD_DEPLOY_WEBHOOK_URL", "https://hooks.example/prod")
        .with("DEV_DEPLOY_WEBHOOK_URL", "https://hooks.example/dev")
}

/// Parse a pipeline from YAML for the given ref
pub fn pipeline_from_yaml(yaml: &str, git_ref: &str) -> Pipeline {
    let config = PipelineConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse pipeline YAML: {}", e));
    let trigger = Trigger::new(SHA, git_ref).unwrap();
    config.to_pipeline(trigger).unwrap()
}

/// Test result from running a pipeline
pub struct PipelineTestResult {
    pub pipeline: Pipeline,
    pub outcome: Result<(), ExecutionError>,
    pub events: Vec<ExecutionEvent>,
    pub builder: MockBuilder,
    pub webhook: MockWebhook,
}

impl PipelineTestResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok() && self.pipeline.state.status == ExecutionStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.is_err() && self.pipeline.state.status == ExecutionStatus::Failed
    }

    pub fn stage_state(&self, stage_id: &str) -> &StageState {
        &self
            .pipeline
            .stage(stage_id)
            .unwrap_or_else(|| panic!("Stage '{}' not found", stage_id))
            .state
    }

    pub fn webhook_calls(&self) -> Vec<(String, Value)> {
        self.webhook.calls.lock().unwrap().clone()
    }

    pub fn builds(&self) -> Vec<BuildRequest> {
        self.builder.builds.lock().unwrap().clone()
    }
}

/// Run a pipeline with mock tools
pub async fn run_with_mocks(
    mut pipeline: Pipeline,
    builder: MockBuilder,
    webhook: MockWebhook,
    secrets: Secrets,
) -> PipelineTestResult {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let executor = StageExecutor::new(builder.clone(), webhook.clone(), secrets);
    let engine = ExecutionEngine::new(executor)
        .with_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

    let outcome = engine.execute(&mut pipeline).await;
    let events = events.lock().unwrap().clone();

    PipelineTestResult {
        pipeline,
        outcome,
        events,
        builder,
        webhook,
    }
}

/// Assert pipeline completed successfully
pub fn assert_pipeline_completed(result: &PipelineTestResult) {
    assert!(
        result.is_success(),
        "Pipeline should be completed, but was {:?} ({:?})",
        result.pipeline.state.status,
        result.outcome
    );
}

/// Assert pipeline failed
pub fn assert_pipeline_failed(result: &PipelineTestResult) {
    assert!(
        result.is_failed(),
        "Pipeline should have failed, but was {:?}",
        result.pipeline.state.status
    );
}

pub fn assert_stage_completed(result: &PipelineTestResult, stage_id: &str) {
    let state = result.stage_state(stage_id);
    assert!(
        matches!(state, StageState::Completed { .. }),
        "Stage '{}' should be completed, but was in state: {:?}",
        stage_id,
        state
    );
}

/// Assert a stage was skipped with a reason containing the text
pub fn assert_stage_skipped(result: &PipelineTestResult, stage_id: &str, expected_reason: &str) {
    match result.stage_state(stage_id) {
        StageState::Skipped { reason } => assert!(
            reason.contains(expected_reason),
            "Stage '{}' skip reason '{}' does not contain '{}'",
            stage_id,
            reason,
            expected_reason
        ),
        other => panic!("Stage '{}' should be skipped, but was {:?}", stage_id, other),
    }
}

/// Assert a stage failed with an error containing the text
pub fn assert_stage_failed(result: &PipelineTestResult, stage_id: &str, expected_error: &str) {
    match result.stage_state(stage_id) {
        StageState::Failed { error, .. } => assert!(
            error.contains(expected_error),
            "Stage '{}' error '{}' does not contain '{}'",
            stage_id,
            error,
            expected_error
        ),
        other => panic!("Stage '{}' should have failed, but was {:?}", stage_id, other),
    }
}
