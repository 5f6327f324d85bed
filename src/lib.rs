//! shipline - build, tag and deploy container images from a CI run

pub mod cli;
pub mod core;
pub mod execution;
pub mod runner;

// Re-export commonly used types
pub use crate::core::{BuildTags, Environment, ExecutionStatus, GitRef, Pipeline, PipelineContext, StageState, Trigger};
pub use crate::execution::{ExecutionEngine, ExecutionError, ExecutionEvent, StageExecutor};
pub use crate::runner::{DockerBuildx, DryRun, HttpWebhook, ImageBuilder, RunnerConfig, RunnerError, Secrets, WebhookDispatcher};
