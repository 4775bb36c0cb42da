/// This module implements the CLI interface for crm-bucket — handling
/// command parsing, argument validation, and the async entrypoint.
///
/// All business logic (task orchestration, serialization, hook clients)
/// lives in the library modules. This module is strictly CLI glue.
///
/// ## How To Use
/// - For command-line users: use the installed `crm-bucket` binary with
///   `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed
///   [`Cli`].
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::ExecutionContext;
use crate::load_config::load_config;
use crate::salesforce::SalesforceClient;
use crate::storage::S3Store;
use crate::task::ExtractTransferTask;

/// CLI for crm-bucket: extract CRM records into an object-storage bucket.
#[derive(Parser)]
#[clap(
    name = "crm-bucket",
    version,
    about = "Extract CRM records via the query API and transfer them to an object-storage bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the extract-and-transfer task once using the given config file
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config } => {
            let task_config = load_config(config)?;
            task_config.trace_loaded();
            tracing::info!(command = "run", "Starting extract-and-transfer task");

            let crm = SalesforceClient::new_from_env().map_err(|e| {
                anyhow::anyhow!("Failed to construct Salesforce client from env: {e}")
            })?;
            let store = S3Store::new_from_env().await.map_err(|e| {
                anyhow::anyhow!("Failed to construct object-storage client from env: {e}")
            })?;

            let ctx = ExecutionContext::new();
            let task = ExtractTransferTask::new(task_config);
            match task.run(&crm, &store, &ctx).await {
                Ok(report) => {
                    tracing::info!(command = "run", ?report, "Extract-and-transfer complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Extract-and-transfer failed");
                    Err(e.into())
                }
            }
        }
    }
}
