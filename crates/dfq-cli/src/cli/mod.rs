//! CLI for the DFQ document formatting queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dfq_core::config;
use dfq_core::queue_db::QueueDb;
use std::path::PathBuf;

use commands::{run_add, run_metrics, run_queue, run_remove, run_scheduler, run_status};

/// Top-level CLI for the DFQ document formatting queue.
#[derive(Debug, Parser)]
#[command(name = "dfq")]
#[command(about = "DFQ: resource-aware document formatting queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Enqueue a document for formatting.
    Add {
        /// Path to the document.
        path: PathBuf,
    },

    /// Run the scheduler until the queue is drained (or forever with --watch).
    Run {
        /// Keep running and pick up jobs as they are enqueued.
        #[arg(long)]
        watch: bool,
        /// Directory for formatted output (default: current directory).
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Show one job's status by its ID.
    Status {
        /// Job identifier.
        id: i64,
    },

    /// Show the queue snapshot (counts and pending jobs in admission order).
    Queue,

    /// Show global queue metrics and long-running jobs.
    Metrics,

    /// Remove a job row by ID.
    Remove {
        /// Job identifier.
        id: i64,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = QueueDb::open_default().await?;

        match cli.command {
            CliCommand::Add { path } => run_add(&db, &path).await?,
            CliCommand::Run { watch, out_dir } => {
                let out_dir = match out_dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                run_scheduler(&db, &cfg, out_dir, watch).await?;
            }
            CliCommand::Status { id } => run_status(&db, id).await?,
            CliCommand::Queue => run_queue(&db, &cfg).await?,
            CliCommand::Metrics => run_metrics(&db, &cfg).await?,
            CliCommand::Remove { id } => run_remove(&db, id).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
