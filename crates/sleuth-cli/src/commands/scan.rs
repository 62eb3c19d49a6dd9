// Commit scan command

use std::sync::Arc;

use crate::analyzer::CommitAnalyzer;
use crate::commands::log::CommitFilter;
use crate::output::OutputFormat;
use crate::scan::{collect_reports, CommitReport, Scanner};
use anyhow::{Context, Result};
use sleuth_history::GitHistory;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Tuning for one scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub filter: CommitFilter,
    /// Commits analyzed at once
    pub concurrency: usize,
    /// Size of the top results list
    pub top: usize,
}

pub async fn run(
    history: GitHistory,
    analyzer: Arc<dyn CommitAnalyzer>,
    options: ScanOptions,
    output: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let run_id = Uuid::now_v7();
    let span = tracing::info_span!("scan", %run_id, workdir = %history.workdir().display());

    async move {
        let commits = options.filter.read(&history).await?;
        info!(commits = commits.len(), "Read commits");

        if output.is_text() {
            println!("Analyzing {} Commits:", commits.len());
        }

        let scanner = Arc::new(Scanner::new(history, analyzer, options.concurrency));
        let summary = collect_reports(scanner.start(commits), options.top, |report| {
            if output.is_text() && !quiet {
                print_report(report);
            }
        })
        .await
        .context("Scan aborted")?;

        if output.is_text() {
            println!();
            println!("Top Results:");
            for report in &summary.top {
                print_report(report);
            }
            if summary.failed > 0 {
                println!();
                println!("{} of {} commits could not be analyzed", summary.failed, summary.analyzed);
            }
        } else {
            output.print_value(&summary)?;
        }

        Ok(())
    }
    .instrument(span)
    .await
}

fn print_report(report: &CommitReport) {
    for line in report_lines(report) {
        println!("{}", line);
    }
}

/// Headline, then the error, or the reasoning when confidence is above zero
fn report_lines(report: &CommitReport) -> Vec<String> {
    let mut lines = vec![report.headline()];
    if let Some(error) = &report.error {
        lines.push(format!("    error: {}", error));
    } else if let Some(reasoning) = report.reasoning.as_ref().filter(|_| report.is_candidate()) {
        lines.push(format!("    {}", reasoning));
    }
    lines
}
