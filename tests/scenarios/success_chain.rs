//! Happy-path runs: prepare, build, deploy in order

use crate::helpers::*;
use shipline::execution::ExecutionEvent;

const APP: &str = r#"
name: "web"
image:
  registry: "ghcr.io"
  repository: "acme/web"
build:
  build_args:
    GIT_SHA: "{{ sha }}"
    RELEASE: "{{ branch_tag }}"
"#;

#[tokio::test]
async fn test_main_builds_both_tags_and_deploys() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/main");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_completed(&result);
    assert_stage_completed(&result, "prepare");
    assert_stage_completed(&result, "build");
    assert_stage_completed(&result, "deploy");

    let builds = result.builds();
    assert_eq!(builds.len(), 1);
    assert_eq!(
        builds[0].tags,
        vec!["ghcr.io/acme/web:main", "ghcr.io/acme/web:abcdef1"]
    );
    assert!(builds[0].push);
    assert_eq!(builds[0].build_args.get("GIT_SHA").map(String::as_str), Some(SHA));
    assert_eq!(builds[0].build_args.get("RELEASE").map(String::as_str), Some("main"));
}

#[tokio::test]
async fn test_stage_outputs_flow_into_context() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/feature/my_branch");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    let ctx = &result.pipeline.context;
    assert_eq!(ctx.stage_output("prepare", "short_sha"), Some("abcdef1"));
    assert_eq!(ctx.stage_output("prepare", "branch_tag"), Some("feature-my-branch"));
    assert_eq!(ctx.stage_output("prepare", "environment"), Some(""));
    assert_eq!(ctx.stage_output("build", "pushed"), Some("true"));
    assert_eq!(
        ctx.stage_output("build", "tags"),
        Some("ghcr.io/acme/web:feature-my-branch,ghcr.io/acme/web:abcdef1")
    );
}

#[tokio::test]
async fn test_events_arrive_in_stage_order() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/develop");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    let started: Vec<&str> = result
        .events
        .iter()
        .filter_map(|event| match event {
            ExecutionEvent::StageStarted { stage_id } => Some(stage_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["prepare", "build", "deploy"]);

    assert!(matches!(result.events.first(), Some(ExecutionEvent::PipelineStarted { .. })));
    assert!(matches!(result.events.last(), Some(ExecutionEvent::PipelineCompleted { .. })));
    assert_eq!(result.pipeline.state.completed_stages, 3);
}

#[tokio::test]
async fn test_disabled_build_still_deploys() {
    let yaml = r#"
name: "web"
image:
  repository: "acme/web"
build:
  enabled: false
"#;
    let pipeline = pipeline_from_yaml(yaml, "refs/heads/main");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_completed(&result);
    assert_stage_skipped(&result, "build", "disabled");
    assert_stage_completed(&result, "deploy");
    assert!(result.builds().is_empty());
    assert_eq!(result.webhook_calls().len(), 1);
}

#[tokio::test]
async fn test_registry_login_uses_configured_secrets() {
    let yaml = r#"
name: "web"
image:
  registry: "ghcr.io"
  repository: "acme/web"
registry_auth:
  username_env: "REGISTRY_USER"
  password_env: "REGISTRY_TOKEN"
"#;
    let secrets = webhook_secrets()
        .with("REGISTRY_USER", "bot")
        .with("REGISTRY_TOKEN", "s3cret");
    let pipeline = pipeline_from_yaml(yaml, "refs/heads/main");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), secrets).await;

    assert_pipeline_completed(&result);
    let logins = result.builder.logins.lock().unwrap().clone();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].registry.as_deref(), Some("ghcr.io"));
    assert_eq!(logins[0].username, "bot");
    assert_eq!(logins[0].password, "s3cret");
}
