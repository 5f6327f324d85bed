//! Stage executor - runs individual stages against the external tools

use crate::{
    core::{
        config::UnmatchedRefPolicy,
        refs::{is_valid_image_tag, BuildTags},
        resolve_environment, Pipeline, Stage, StageKind,
    },
    runner::{BuildRequest, ImageBuilder, RegistryLogin, RunnerError, Secrets, WebhookDispatcher},
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Result of executing a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// Stage completed; outputs flow into the context
    Success { outputs: BTreeMap<String, String> },
    /// Stage chose not to run
    Skipped { reason: String },
    /// Stage failed
    Failed { error: String },
}

impl From<RunnerError> for StageResult {
    fn from(err: RunnerError) -> Self {
        StageResult::Failed {
            error: err.to_string(),
        }
    }
}

/// Executes a single stage
pub struct StageExecutor<B, W> {
    builder: B,
    webhook: W,
    secrets: Secrets,
}

impl<B: ImageBuilder, W: WebhookDispatcher> StageExecutor<B, W> {
    pub fn new(builder: B, webhook: W, secrets: Secrets) -> Self {
        Self {
            builder,
            webhook,
            secrets,
        }
    }

    /// Execute a stage and return the result
    pub async fn execute(&self, stage: &Stage, pipeline: &Pipeline) -> StageResult {
        info!("Executing stage: {}", stage.id);

        let work = async {
            match stage.kind {
                StageKind::Prepare => self.prepare(pipeline),
                StageKind::Build => self.build(pipeline).await,
                StageKind::Deploy => self.deploy(pipeline).await,
            }
        };

        match timeout(Duration::from_secs(stage.timeout_secs), work).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Timeout for stage {} after {}s", stage.id, stage.timeout_secs);
                RunnerError::Timeout(stage.timeout_secs).into()
            }
        }
    }

    /// Derive short SHA, branch tag and environment
    fn prepare(&self, pipeline: &Pipeline) -> StageResult {
        let tags = match BuildTags::derive(&pipeline.trigger) {
            Ok(tags) => tags,
            Err(e) => return StageResult::Failed { error: e.to_string() },
        };

        let environment = resolve_environment(&pipeline.rules, &pipeline.trigger.git_ref);
        match &environment {
            Some(env) => info!("Ref {} deploys to {}", pipeline.trigger.git_ref, env.name),
            None => warn!("Ref {} matches no environment", pipeline.trigger.git_ref),
        }

        let mut outputs = BTreeMap::new();
        outputs.insert("short_sha".to_string(), tags.short_sha);
        outputs.insert("branch_tag".to_string(), tags.branch_tag);
        outputs.insert(
            "environment".to_string(),
            environment.map(|env| env.name).unwrap_or_default(),
        );
        StageResult::Success { outputs }
    }

    /// Log in if a credential is configured, then build and push
    async fn build(&self, pipeline: &Pipeline) -> StageResult {
        let config = &pipeline.config;

        let tags = match image_refs(pipeline) {
            Ok(tags) => tags,
            Err(e) => return e.into(),
        };

        if let Some(login) = self.registry_login(pipeline) {
            if let Err(e) = self.builder.login(&login).await {
                return e.into();
            }
        }

        let request = BuildRequest {
            context: config.build.context.clone(),
            dockerfile: config.build.dockerfile.clone(),
            tags,
            platforms: config.build.platforms.clone(),
            build_args: config
                .build
                .build_args
                .iter()
                .map(|(key, template)| (key.clone(), pipeline.context.render(template)))
                .collect(),
            push: config.build.push,
        };

        match self.builder.build_and_push(&request).await {
            Ok(report) => {
                let mut outputs = BTreeMap::new();
                outputs.insert("tags".to_string(), report.tags.join(","));
                outputs.insert("pushed".to_string(), report.pushed.to_string());
                StageResult::Success { outputs }
            }
            Err(e) => e.into(),
        }
    }

    fn registry_login(&self, pipeline: &Pipeline) -> Option<RegistryLogin> {
        let auth = pipeline.config.registry_auth.as_ref()?;

        match (
            self.secrets.get(&auth.username_env),
            self.secrets.get(&auth.password_env),
        ) {
            (Some(username), Some(password)) => Some(RegistryLogin {
                registry: pipeline.config.image.registry_host(),
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => {
                warn!(
                    "{} or {} not set, relying on existing registry credential",
                    auth.username_env, auth.password_env
                );
                None
            }
        }
    }

    /// POST the deployment payload to the environment's webhook
    async fn deploy(&self, pipeline: &Pipeline) -> StageResult {
        let environment = match resolve_environment(&pipeline.rules, &pipeline.trigger.git_ref) {
            Some(env) => env,
            None => {
                let reason = format!("no environment for ref {}", pipeline.trigger.git_ref);
                return match pipeline.config.deploy.on_unmatched_ref {
                    UnmatchedRefPolicy::Skip => StageResult::Skipped { reason },
                    UnmatchedRefPolicy::Fail => StageResult::Failed { error: reason },
                };
            }
        };

        let url = match self.secrets.get(&environment.webhook_secret) {
            Some(url) => url,
            None => return RunnerError::MissingSecret(environment.webhook_secret).into(),
        };

        let payload = match deploy_payload(pipeline) {
            Ok(payload) => payload,
            Err(e) => return e.into(),
        };
        debug!("Deploy payload: {}", payload);

        match self.webhook.dispatch(url, &payload).await {
            Ok(response) => {
                let mut outputs = BTreeMap::new();
                outputs.insert("webhook_status".to_string(), response.status.to_string());
                StageResult::Success { outputs }
            }
            Err(e) => e.into(),
        }
    }
}

/// Full `image:tag` references, rendered against the context and deduplicated
pub fn image_refs(pipeline: &Pipeline) -> Result<Vec<String>, RunnerError> {
    let image = pipeline.config.image.reference();
    let mut refs = Vec::new();

    for template in &pipeline.config.image.tags {
        let tag = pipeline.context.render(template);
        if !is_valid_image_tag(&tag) {
            return Err(RunnerError::InvalidTag(tag));
        }
        let full = format!("{}:{}", image, tag);
        if !refs.contains(&full) {
            refs.push(full);
        }
    }

    Ok(refs)
}

/// JSON body sent to the deploy webhook
pub fn deploy_payload(pipeline: &Pipeline) -> Result<Value, RunnerError> {
    let ctx = &pipeline.context;
    let var = |key: &str| ctx.get(key).unwrap_or_default().to_string();

    let mut payload = Map::new();
    payload.insert("environment".to_string(), json!(var("environment")));
    payload.insert("image".to_string(), json!(pipeline.config.image.reference()));
    payload.insert("tags".to_string(), json!(image_refs(pipeline)?));
    payload.insert("sha".to_string(), json!(pipeline.trigger.sha));
    payload.insert("ref".to_string(), json!(pipeline.trigger.git_ref.as_str()));
    payload.insert("short_sha".to_string(), json!(var("short_sha")));
    payload.insert("branch_tag".to_string(), json!(var("branch_tag")));

    for (key, template) in &pipeline.config.deploy.payload {
        payload.insert(key.clone(), json!(ctx.render(template)));
    }

    Ok(Value::Object(payload))
}
