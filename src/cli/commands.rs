//! CLI command definitions

use crate::core::Trigger;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Commit and ref of the run, defaulting to the CI environment
#[derive(Debug, Args, Clone)]
pub struct TriggerArgs {
    /// Full commit SHA
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// Ref that triggered the run (e.g. refs/heads/main)
    #[arg(long = "ref", env = "GITHUB_REF")]
    pub git_ref: Option<String>,
}

impl TriggerArgs {
    pub fn resolve(&self) -> Result<Trigger> {
        let sha = self
            .sha
            .as_deref()
            .context("No commit SHA: pass --sha or set GITHUB_SHA")?;
        let git_ref = self
            .git_ref
            .as_deref()
            .context("No ref: pass --ref or set GITHUB_REF")?;
        Ok(Trigger::new(sha, git_ref)?)
    }
}

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    #[command(flatten)]
    pub trigger: TriggerArgs,

    /// Variable overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub var: Vec<(String, String)>,

    /// Log the docker and webhook calls instead of making them
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the docker executable
    #[arg(long, env = "SHIPLINE_DOCKER", default_value = "docker")]
    pub docker: String,
}

/// Compute the run's tags and environment
#[derive(Debug, Args, Clone)]
pub struct PrepareCommand {
    /// Pipeline YAML file with custom environment rules
    #[arg(short, long)]
    pub file: Option<String>,

    #[command(flatten)]
    pub trigger: TriggerArgs,

    /// Append key=value lines to this file (CI step outputs)
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub github_output: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
