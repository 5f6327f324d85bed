//! CLI output formatting

use crate::{
    core::{ExecutionStatus, StageState},
    execution::ExecutionEvent,
};
use anyhow::{Context, Result};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for a long-running stage
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a stage state for display
pub fn format_stage_state(state: &StageState) -> String {
    match state {
        StageState::Pending => style("PENDING").dim().to_string(),
        StageState::Running { .. } => style("RUNNING").yellow().to_string(),
        StageState::Completed { .. } => style("COMPLETED").green().to_string(),
        StageState::Failed { .. } => style("FAILED").red().to_string(),
        StageState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
        } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StageStarted { stage_id } => {
            format!("{} {}", SPINNER, style(stage_id).cyan())
        }
        ExecutionEvent::StageCompleted { stage_id, outputs } => {
            if outputs.is_empty() {
                format!("{} {}", CHECK, style(stage_id).green())
            } else {
                format!(
                    "{} {}\n{}",
                    CHECK,
                    style(stage_id).green(),
                    format_outputs(outputs, "    ")
                )
            }
        }
        ExecutionEvent::StageSkipped { stage_id, reason } => {
            format!("{} {} ({})", SKIP, style(stage_id).dim(), style(reason).dim())
        }
        ExecutionEvent::StageFailed { stage_id, error } => {
            format!("{} {}: {}", CROSS, style(stage_id).red(), style(error).dim())
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => format!(
            "{} Pipeline ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// One `key = value` line per output
pub fn format_outputs(outputs: &BTreeMap<String, String>, indent: &str) -> String {
    outputs
        .iter()
        .map(|(key, value)| {
            let value = if value.is_empty() {
                style("(unset)").dim().to_string()
            } else {
                value.clone()
            };
            format!("{}{} = {}", indent, style(key).cyan(), value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append `key=value` lines to a CI step output file
pub fn write_github_outputs(path: &Path, outputs: &BTreeMap<String, String>) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    for (key, value) in outputs {
        writeln!(file, "{}={}", key, value)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}
