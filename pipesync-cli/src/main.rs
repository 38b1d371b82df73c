//! pipesync CLI - reconcile experiments, pipelines and pipeline versions.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipesync::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "pipesync")]
#[command(version)]
#[command(about = "Idempotent reconciliation against a pipeline orchestration API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Orchestrator endpoint, overrides the configuration file
    #[arg(long, global = true, env = "PIPESYNC_HOST")]
    host: Option<String>,

    /// Namespace for namespaced resources
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Bearer token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage experiments
    #[command(subcommand)]
    Experiment(ExperimentCommand),

    /// Manage pipelines
    #[command(subcommand)]
    Pipeline(PipelineCommand),

    /// Manage pipeline versions
    #[command(subcommand)]
    Version(VersionCommand),
}

#[derive(Subcommand)]
enum ExperimentCommand {
    /// Create the experiment unless it already exists
    Ensure {
        /// Experiment name
        #[arg(long)]
        name: String,

        /// Description used when creating
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete the experiment if it exists
    Remove {
        /// Experiment name
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Delete the pipeline if it exists
    Remove {
        /// Pipeline name
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum VersionCommand {
    /// Upload a packaged pipeline, replacing a same-named version
    Upload {
        /// Path to the compiled pipeline package
        #[arg(short, long)]
        package: PathBuf,

        /// Target pipeline name
        #[arg(long)]
        pipeline: String,

        /// Version name
        #[arg(long)]
        version: String,

        /// Version description
        #[arg(short, long)]
        description: Option<String>,

        /// Delete-and-retry cycles allowed on conflict
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Delete the newest version with the given name
    Remove {
        /// Pipeline name
        #[arg(long)]
        pipeline: String,

        /// Version name
        #[arg(long)]
        version: String,
    },
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(host) = &cli.host {
        config = config.with_host(host.clone());
    }
    if let Some(namespace) = &cli.namespace {
        config = config.with_namespace(namespace.clone());
    }
    if let Some(token) = &cli.token {
        config = config.with_token(token.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    let config = load_config(&cli)?;
    info!(host = %config.base_url(), "Connecting to orchestrator");

    let client = ReconcileClient::from_config(&config)
        .context("Failed to build orchestrator client")?
        .with_event_sink(Arc::new(LoggingEventSink::debug()));
    let namespace = config.namespace.as_deref();

    match cli.command {
        Commands::Experiment(ExperimentCommand::Ensure { name, description }) => {
            let outcome = client
                .experiments()
                .ensure(&name, description.as_deref(), namespace)
                .await
                .with_context(|| format!("Failed to ensure experiment '{name}'"))?;
            let experiment = outcome.experiment();
            if outcome.was_created() {
                println!("Created experiment '{}' ({})", experiment.name, experiment.experiment_id);
            } else {
                println!("Experiment '{}' exists ({})", experiment.name, experiment.experiment_id);
            }
        }

        Commands::Experiment(ExperimentCommand::Remove { name }) => {
            match client
                .experiments()
                .remove(&name, namespace)
                .await
                .with_context(|| format!("Failed to remove experiment '{name}'"))?
            {
                RemoveOutcome::Deleted(experiment) => {
                    println!("Deleted experiment '{}' ({})", experiment.name, experiment.experiment_id);
                }
                RemoveOutcome::NotFound(missing) => println!("{missing}, nothing to delete"),
            }
        }

        Commands::Pipeline(PipelineCommand::Remove { name }) => {
            match client
                .pipelines()
                .remove(&name)
                .await
                .with_context(|| format!("Failed to remove pipeline '{name}'"))?
            {
                RemoveOutcome::Deleted(pipeline) => {
                    println!("Deleted pipeline '{}' ({})", pipeline.name, pipeline.pipeline_id);
                }
                RemoveOutcome::NotFound(missing) => println!("{missing}, nothing to delete"),
            }
        }

        Commands::Version(VersionCommand::Upload {
            package,
            pipeline,
            version,
            description,
            retries,
        }) => {
            let uploads = client.uploads();
            let budget = RetryBudget::new(retries.unwrap_or(uploads.policy().retry_budget));
            let outcome = uploads
                .upload_with_budget(&package, &version, &pipeline, description.as_deref(), budget)
                .await
                .with_context(|| format!("Failed to upload version '{version}' of '{pipeline}'"))?;

            println!(
                "Uploaded version '{}' of '{}' ({})",
                outcome.version.display_name, pipeline, outcome.version.pipeline_version_id
            );
            println!("Attempts:    {}", outcome.attempts);
            for replaced in &outcome.replaced {
                println!("Replaced:    {replaced}");
            }
        }

        Commands::Version(VersionCommand::Remove { pipeline, version }) => {
            match client
                .pipelines()
                .remove_version(&pipeline, &version)
                .await
                .with_context(|| format!("Failed to remove version '{version}' of '{pipeline}'"))?
            {
                RemoveOutcome::Deleted(removed) => {
                    println!(
                        "Deleted version '{}' of '{}' ({})",
                        removed.display_name, pipeline, removed.pipeline_version_id
                    );
                }
                RemoveOutcome::NotFound(missing) => println!("{missing}, nothing to delete"),
            }
        }
    }

    Ok(())
}
