//! CLI for the FDM download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use fdm_core::config;
use fdm_core::store::JobStore;

use commands::{
    run_add, run_completions, run_pause, run_remove, run_resume, run_status, run_stop,
    run_transfers,
};

/// Top-level CLI for the FDM download manager.
#[derive(Debug, Parser)]
#[command(name = "fdm")]
#[command(about = "FDM: concurrent multi-range download manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add a new download job.
    Add {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Destination directory (default: configured download dir, else cwd).
        #[arg(long, value_name = "DIR")]
        dir: Option<std::path::PathBuf>,

        /// Destination file name (default: derived from the URL).
        #[arg(long, value_name = "NAME")]
        file_name: Option<String>,

        /// Concurrent connections for this job (clamped to 1-10).
        #[arg(long, default_value = "4", value_name = "N")]
        threads: u32,

        /// Tag for later filtering; repeat for multiple tags.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Run pending jobs (all, or the given ids) and stream progress.
    /// Ctrl-C pauses the active transfers.
    Run {
        /// Job ids to run; empty runs every pending job.
        ids: Vec<i64>,
    },

    /// Show status of all jobs.
    Status {
        /// Only show jobs carrying any of these tags; repeat for multiple.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Emit machine-readable JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Pause a job by its ID.
    Pause {
        /// Job identifier.
        id: i64,
    },

    /// Resume a paused job by its ID and wait for it.
    Resume {
        /// Job identifier.
        id: i64,
    },

    /// Cancel a job by its ID; partial data stays on disk.
    Stop {
        /// Job identifier.
        id: i64,
    },

    /// Remove a job record by ID (downloaded files are kept).
    Remove {
        /// Job identifier.
        id: i64,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(());
        }

        let store = JobStore::open_default().await?;
        match cli.command {
            CliCommand::Add {
                url,
                dir,
                file_name,
                threads,
                tags,
            } => run_add(&store, &cfg, &url, dir, file_name, threads, &tags).await?,
            CliCommand::Run { ids } => run_transfers(store, &cfg, ids).await?,
            CliCommand::Status { tags, json } => run_status(&store, &tags, json).await?,
            CliCommand::Pause { id } => run_pause(&store, id).await?,
            CliCommand::Resume { id } => run_resume(store, &cfg, id).await?,
            CliCommand::Stop { id } => run_stop(&store, id).await?,
            CliCommand::Remove { id } => run_remove(&store, id).await?,
            CliCommand::Completions { .. } => unreachable!("handled above"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
