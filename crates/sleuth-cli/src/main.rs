// Sleuth CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Every tunable has an env fallback; .env is loaded first.

mod analyzer;
mod commands;
mod output;
mod scan;
mod telemetry;
mod verdict;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use sleuth_history::{GitHistory, TokioProcessRunner};

use crate::analyzer::CommandAnalyzer;
use crate::commands::log::CommitFilter;
use crate::commands::scan::ScanOptions;
use crate::output::OutputFormat;
use crate::telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "sleuth")]
#[command(about = "Sleuth - Scan a repository's commit history with an external analyzer")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Cap on captured git output in bytes
    #[arg(long, global = true, env = "SLEUTH_MAX_OUTPUT")]
    pub max_output: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze commits and report the most suspicious ones
    Scan {
        /// Repository directory
        dir: PathBuf,

        /// Shell command that reads a commit on stdin and prints a verdict
        #[arg(long, short, env = "SLEUTH_ANALYZER_CMD")]
        analyzer: String,

        /// Shell used to run the analyzer command
        #[arg(long, env = "SLEUTH_SHELL", default_value = "sh")]
        shell: String,

        /// Commits analyzed at once
        #[arg(long, short, env = "SLEUTH_CONCURRENCY", default_value = "20")]
        concurrency: usize,

        /// Number of top results to keep
        #[arg(long, env = "SLEUTH_TOP", default_value = "10")]
        top: usize,

        /// Per-commit analyzer timeout in seconds (0 disables)
        #[arg(long, env = "SLEUTH_ANALYZER_TIMEOUT", default_value = "300")]
        timeout: u64,

        /// Only commits by this author email
        #[arg(long)]
        author: Option<String>,

        /// Only the newest N commits
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List unique commit authors
    Authors {
        /// Repository directory
        dir: PathBuf,
    },

    /// List commits
    Log {
        /// Repository directory
        dir: PathBuf,

        /// Only commits by this author email
        #[arg(long)]
        author: Option<String>,

        /// Only the newest N commits
        #[arg(long, short)]
        limit: Option<usize>,
    },
}

fn open_history(dir: &Path, max_output: Option<usize>) -> Result<GitHistory> {
    ensure!(dir.is_dir(), "Not a directory: {}", dir.display());

    let runner = match max_output {
        Some(bytes) => TokioProcessRunner::new().with_max_output(bytes),
        None => TokioProcessRunner::new(),
    };
    Ok(GitHistory::new(Arc::new(runner), dir))
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if cli.quiet {
        telemetry = telemetry.quiet();
    }
    init_telemetry(telemetry);
    if let Ok(path) = dotenv {
        tracing::debug!("Loaded .env from {:?}", path);
    }

    let output_format = OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Scan {
            dir,
            analyzer,
            shell,
            concurrency,
            top,
            timeout,
            author,
            limit,
        } => {
            let history = open_history(&dir, cli.max_output)?;
            let mut analyzer = CommandAnalyzer::new(analyzer).with_shell(shell);
            if timeout > 0 {
                analyzer = analyzer.with_timeout(Duration::from_secs(timeout));
            }
            let options = ScanOptions {
                filter: CommitFilter { author, limit },
                concurrency,
                top,
            };
            commands::scan::run(history, Arc::new(analyzer), options, output_format, cli.quiet)
                .await
        }
        Commands::Authors { dir } => {
            let history = open_history(&dir, cli.max_output)?;
            commands::authors::run(&history, output_format).await
        }
        Commands::Log { dir, author, limit } => {
            let history = open_history(&dir, cli.max_output)?;
            commands::log::run(&history, &CommitFilter { author, limit }, output_format).await
        }
    }
}
