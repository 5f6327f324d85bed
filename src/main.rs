use anyhow::{Context, Result};
use indicatif::ProgressBar;
use shipline::cli::commands::{PrepareCommand, RunCommand, ValidateCommand};
use shipline::cli::output::*;
use shipline::cli::{Cli, Command};
use shipline::core::config::PipelineConfig;
use shipline::core::rules::default_rules;
use shipline::core::{resolve_environment, BuildTags, Pipeline};
use shipline::execution::{ExecutionEngine, ExecutionEvent, StageExecutor};
use shipline::runner::{
    DockerBuildx, DryRun, HttpWebhook, ImageBuilder, RunnerConfig, Secrets, WebhookDispatcher,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; CI provides the environment directly
    let dotenv = dotenvy::dotenv();

    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Prepare(cmd) => prepare(cmd)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    // Load pipeline config
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;

    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    let trigger = cmd.trigger.resolve()?;
    let mut pipeline = config.to_pipeline(trigger)?;

    // Apply variable overrides
    for (key, value) in &cmd.var {
        pipeline.set_variable(key, value)?;
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let mut secret_names = config.webhook_secret_names();
    if let Some(auth) = &config.registry_auth {
        secret_names.push(auth.username_env.clone());
        secret_names.push(auth.password_env.clone());
    }
    let secrets = Secrets::from_env(&secret_names);
    debug!("Secrets available: {:?}", secrets);

    println!();
    let succeeded = if cmd.dry_run {
        println!("{} Dry run: no image is built and no webhook is called", INFO);
        execute(StageExecutor::new(DryRun, DryRun, secrets), &mut pipeline).await
    } else {
        let runner_config = RunnerConfig::for_pipeline(&config, cmd.docker.clone());
        let builder = DockerBuildx::new(runner_config.docker_path().to_string());
        let webhook = HttpWebhook::new(&runner_config)?;
        execute(StageExecutor::new(builder, webhook, secrets), &mut pipeline).await
    };

    println!();
    for stage in &pipeline.stages {
        println!("  {:<8} {}", stage.id, format_stage_state(&stage.state));
    }
    let state = &pipeline.state;
    println!(
        "  {} of {} stages finished ({:.0}%)",
        state.completed_stages + state.failed_stages + state.skipped_stages,
        state.total_stages,
        state.progress() * 100.0
    );

    // Print final status
    if succeeded {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&pipeline.name).bold(),
            style("failed").red()
        );
        std::process::exit(1);
    }

    Ok(())
}

/// Run the engine with console output; returns whether the run succeeded
async fn execute<B, W>(executor: StageExecutor<B, W>, pipeline: &mut Pipeline) -> bool
where
    B: ImageBuilder,
    W: WebhookDispatcher,
{
    let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));

    let engine = ExecutionEngine::new(executor).with_event_handler(move |event| {
        let Ok(mut active) = spinner.lock() else {
            return;
        };
        if let Some(bar) = active.take() {
            bar.finish_and_clear();
        }

        println!("{}", format_execution_event(event));

        if let ExecutionEvent::StageStarted { stage_id } = event {
            if stage_id == "build" {
                *active = Some(create_spinner("building image".to_string()));
            }
        }
    });

    match engine.execute(pipeline).await {
        Ok(()) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

fn prepare(cmd: &PrepareCommand) -> Result<()> {
    let rules = match &cmd.file {
        Some(file) => PipelineConfig::from_file(file)
            .context("Failed to load pipeline config")?
            .environment_rules()?,
        None => default_rules(),
    };

    let trigger = cmd.trigger.resolve()?;
    let tags = BuildTags::derive(&trigger)?;
    let environment = resolve_environment(&rules, &trigger.git_ref);

    let mut outputs = BTreeMap::new();
    outputs.insert("short_sha".to_string(), tags.short_sha);
    outputs.insert("branch_tag".to_string(), tags.branch_tag);
    outputs.insert(
        "environment".to_string(),
        environment.map(|env| env.name).unwrap_or_default(),
    );

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        println!("{}", format_outputs(&outputs, ""));
    }

    if let Some(path) = &cmd.github_output {
        write_github_outputs(path, &outputs)?;
        debug!("Wrote step outputs to {}", path.display());
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Image: {}", style(config.image.reference()).cyan());
            println!("  Tags: {}", style(config.image.tags.join(", ")).cyan());
            for env in &config.environments {
                println!(
                    "  Environment: {} ← {} ({})",
                    style(&env.name).bold(),
                    style(&env.git_ref).cyan(),
                    style(&env.webhook_secret).dim()
                );
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}
