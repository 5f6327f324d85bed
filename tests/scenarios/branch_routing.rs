//! Ref → environment → webhook routing

use crate::helpers::*;

const APP: &str = r#"
name: "api"
image:
  repository: "acme/api"
deploy:
  payload:
    service: "{{ service }}"
variables:
  service: "api"
"#;

#[tokio::test]
async fn test_main_posts_to_prod_webhook() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/main");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_completed(&result);
    let calls = result.webhook_calls();
    assert_eq!(calls.len(), 1);

    let (url, payload) = &calls[0];
    assert_eq!(url, "https://hooks.example/prod");
    assert_eq!(payload["environment"], "prod");
    assert_eq!(payload["image"], "acme/api");
    assert_eq!(payload["sha"], SHA);
    assert_eq!(payload["ref"], "refs/heads/main");
    assert_eq!(payload["short_sha"], "abcdef1");
    assert_eq!(payload["branch_tag"], "main");
    assert_eq!(payload["service"], "api");
    assert_eq!(
        payload["tags"],
        serde_json::json!(["acme/api:main", "acme/api:abcdef1"])
    );
}

#[tokio::test]
async fn test_develop_posts_to_dev_webhook() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/develop");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_completed(&result);
    let calls = result.webhook_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "https://hooks.example/dev");
    assert_eq!(calls[0].1["environment"], "dev");
    assert_eq!(
        result.pipeline.context.stage_output("deploy", "webhook_status"),
        Some("200")
    );
}

#[tokio::test]
async fn test_feature_branch_builds_but_skips_deploy() {
    let pipeline = pipeline_from_yaml(APP, "refs/heads/feature/login_form");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_completed(&result);
    assert_stage_completed(&result, "build");
    assert_stage_skipped(&result, "deploy", "no environment for ref refs/heads/feature/login_form");
    assert!(result.webhook_calls().is_empty());
    assert_eq!(
        result.builds()[0].tags,
        vec!["acme/api:feature-login-form", "acme/api:abcdef1"]
    );
}

#[tokio::test]
async fn test_unmatched_ref_fails_when_configured() {
    let yaml = r#"
name: "api"
image:
  repository: "acme/api"
deploy:
  on_unmatched_ref: fail
"#;
    let pipeline = pipeline_from_yaml(yaml, "refs/heads/hotfix");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), webhook_secrets()).await;

    assert_pipeline_failed(&result);
    assert_stage_completed(&result, "build");
    assert_stage_failed(&result, "deploy", "no environment for ref");
}

#[tokio::test]
async fn test_custom_regex_rules_pick_first_match() {
    let yaml = r#"
name: "api"
image:
  repository: "acme/api"
environments:
  - name: "staging"
    ref: "^refs/heads/release/.*$"
    use_regex: true
    webhook_secret: "STAGING_DEPLOY_WEBHOOK_URL"
  - name: "catch-all"
    ref: "^refs/heads/.*$"
    use_regex: true
    webhook_secret: "DEV_DEPLOY_WEBHOOK_URL"
"#;
    let secrets = webhook_secrets().with("STAGING_DEPLOY_WEBHOOK_URL", "https://hooks.example/staging");
    let pipeline = pipeline_from_yaml(yaml, "refs/heads/release/1.4");
    let result = run_with_mocks(pipeline, MockBuilder::default(), MockWebhook::new(), secrets).await;

    assert_pipeline_completed(&result);
    let calls = result.webhook_calls();
    assert_eq!(calls[0].0, "https://hooks.example/staging");
    assert_eq!(calls[0].1["environment"], "staging");
}
