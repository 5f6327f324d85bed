//! Failures stop the run and skip what comes after

use crate::helpers::*;
use shipline::execution::ExecutionError;

const APP: &str = r#"
name: "worker"
image:
  repository: "acme/worker"
"#;

#[tokio::test]
async fn test_build_failure_skips_deploy() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/main");
    let result = run_with_mocks(
        pipeline,
        MockBuilder::failing("failed to solve: dockerfile parse error"),
        MockWebhook::new(),
        webhook_secrets(),
    )
    .await;

    assert_pipeline_failed(&result);
    assert_stage_completed(&result, "prepare");
    assert_stage_failed(&result, "build", "dockerfile parse error");
    assert_stage_skipped(&result, "deploy", "upstream stage 'build' failed");
    assert!(result.webhook_calls().is_empty());

    match &result.outcome {
        Err(ExecutionError::StageFailed { stage, .. }) => assert_eq!(stage, "build"),
        other => panic!("Expected build failure, got {:?}", other),
    }
    assert_eq!(result.pipeline.state.failed_stages, 1);
    assert_eq!(result.pipeline.state.skipped_stages, 1);
}

#[tokio::test]
async fn test_missing_webhook_secret_fails_deploy() {
    let secrets = shipline::runner::Secrets::new()
        .with("DEV_DEPLOY_WEBHOOK_URL", "https://hooks.example/dev");
    let pipeline = pipeline_from_yaml(APP, "refs/heads/main");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), secrets).await;

    assert_pipeline_failed(&result);
    assert_stage_completed(&result, "build");
    assert_stage_failed(&result, "deploy", "PROD_DEPLOY_WEBHOOK_URL");
    assert!(result.webhook_calls().is_empty());
}

#[tokio::test]
async fn test_webhook_rejection_fails_deploy() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/develop");
    let result = run_with_mocks(
        pipeline,
        MockBuilder::default(),
        MockWebhook::with_status(502),
        webhook_secrets(),
    )
    .await;

    assert_pipeline_failed(&result);
    assert_stage_failed(&result, "deploy", "502");
    assert_eq!(result.webhook_calls().len(), 1);
}

#[tokio::test]
async fn test_invalid_rendered_tag_fails_build() {
    let yaml = r#"
name: "worker"
image:
  repository: "acme/worker"
  tags:
    - "{{ channel }}"
variables:
  channel: "not a tag"
"#;
    let pipeline = pipeline_from_yaml(yaml, "refs/heads/main");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_failed(&result);
    assert_stage_failed(&result, "build", "not a tag");
    assert!(result.builds().is_empty());
    assert_stage_skipped(&result, "deploy", "upstream");
}

#[test]
fn test_unknown_template_variable_is_rejected() {
    let yaml = r#"
name: "worker"
image:
  repository: "acme/worker"
  tags:
    - "{{ version }}"
"#;
    let err = shipline::core::config::PipelineConfig::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("unknown variable 'version'"));
}
