//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    context::{PipelineContext, BUILTIN_VARIABLES},
    refs::Trigger,
    rules::EnvironmentRule,
    stage::{Stage, StageKind},
    state::{ExecutionStatus, PipelineState, StageState},
};
use anyhow::Result;

/// A pipeline run: prepare → build → deploy
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Inputs of this run
    pub trigger: Trigger,

    /// Stages in execution order
    pub stages: Vec<Stage>,

    /// Variables and stage outputs
    pub context: PipelineContext,

    /// Compiled environment rules
    pub rules: Vec<EnvironmentRule>,

    /// Configuration the pipeline was built from
    pub config: PipelineConfig,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig, trigger: Trigger) -> Result<Self> {
        let prepare = Stage::new(StageKind::Prepare, vec![], 30);

        let build_needs = vec![StageKind::Prepare.id().to_string()];
        let build = if config.build.enabled {
            Stage::new(StageKind::Build, build_needs, config.build.timeout_secs)
        } else {
            Stage::disabled(StageKind::Build, build_needs)
        };

        let deploy_needs = vec![StageKind::Build.id().to_string()];
        let deploy = if config.deploy.enabled {
            Stage::new(StageKind::Deploy, deploy_needs, config.deploy.timeout_secs)
        } else {
            Stage::disabled(StageKind::Deploy, deploy_needs)
        };

        let mut context = PipelineContext::new();
        for (key, value) in &config.variables {
            context.set(key.clone(), value.clone());
        }
        context.set("sha", trigger.sha.clone());
        context.set("ref", trigger.git_ref.to_string());
        context.set("image", config.image.reference());

        Ok(Pipeline {
            name: config.name.clone(),
            trigger,
            stages: vec![prepare, build, deploy],
            context,
            rules: config.environment_rules()?,
            config: config.clone(),
            state: PipelineState::new(),
        })
    }

    /// Get a stage by ID
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Get a mutable stage by ID
    pub fn stage_mut(&mut self, id: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.id == id)
    }

    /// Override a user variable for this run
    ///
    /// Built-in variables are derived from the trigger and cannot be overridden.
    pub fn set_variable(&mut self, key: &str, value: &str) -> Result<()> {
        if BUILTIN_VARIABLES.contains(&key) {
            anyhow::bail!("'{}' is derived from the run and cannot be overridden", key);
        }
        self.context.set(key, value);
        Ok(())
    }

    /// First pending stage, in order
    pub fn next_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| matches!(s.state, StageState::Pending))
    }

    /// Whether every stage a stage needs has completed or been skipped
    pub fn needs_met(&self, stage: &Stage) -> bool {
        stage.needs.iter().all(|need| {
            self.stage(need)
                .is_some_and(|dep| dep.state.satisfies_dependents())
        })
    }

    /// Check if every stage is in a terminal state
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|s| s.state.is_terminal())
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Recount stage states into the pipeline state
    pub fn update_counts(&mut self) {
        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for stage in &self.stages {
            match &stage.state {
                StageState::Completed { .. } => completed += 1,
                StageState::Failed { .. } => failed += 1,
                StageState::Skipped { .. } => skipped += 1,
                _ => {}
            }
        }

        self.state.total_stages = self.stages.len();
        self.state.completed_stages = completed;
        self.state.failed_stages = failed;
        self.state.skipped_stages = skipped;
    }
}
