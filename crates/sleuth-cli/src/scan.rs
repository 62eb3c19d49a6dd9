// Commit scan pipeline
//
// Design Decision: Per-commit failures become reports with an `error` set and
// never stop the scan. Only errors that make every later commit fail too
// (analyzer or git unavailable) end the result queue with an error.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use sleuth_core::{from_iter, parallel_map_to_queue, AsyncQueue, TopResultsBucket, WorkerPanic};
use sleuth_history::{Commit, GitHistory};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::analyzer::{AnalysisError, CommitAnalyzer};
use crate::verdict::Verdict;

/// Errors that abort a whole scan
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error(transparent)]
    Analyzer(#[from] AnalysisError),

    #[error("git unavailable: {0}")]
    GitUnavailable(String),

    #[error(transparent)]
    Panicked(#[from] WorkerPanic),
}

/// Outcome of analyzing one commit
#[derive(Debug, Clone, Serialize)]
pub struct CommitReport {
    pub commit: Commit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommitReport {
    fn analyzed(commit: Commit, verdict: Verdict) -> Self {
        Self {
            commit,
            response: Some(verdict.response),
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
            error: None,
        }
    }

    fn failed(commit: Commit, error: impl ToString) -> Self {
        Self {
            commit,
            response: None,
            confidence: None,
            reasoning: None,
            error: Some(error.to_string()),
        }
    }

    /// Confidence for display, `?` when unknown
    pub fn confidence_label(&self) -> String {
        self.confidence
            .map_or_else(|| "?".to_string(), |c| c.to_string())
    }

    /// One-line summary: `[confidence] hash (date) - message`
    pub fn headline(&self) -> String {
        format!(
            "[{}] {} ({}) - {}",
            self.confidence_label(),
            self.commit.hash,
            self.commit.date.to_rfc3339(),
            self.commit.message
        )
    }

    /// Whether the report qualifies for the top results
    pub fn is_candidate(&self) -> bool {
        self.error.is_none() && self.confidence.is_some_and(|c| c > 0.0)
    }
}

fn confidence_of(report: &CommitReport) -> f64 {
    report.confidence.unwrap_or(0.0)
}

/// Totals and top results of a finished scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub analyzed: usize,
    pub failed: usize,
    pub top: Vec<CommitReport>,
}

/// Runs the analyzer over commits with bounded concurrency
pub struct Scanner {
    history: GitHistory,
    analyzer: Arc<dyn CommitAnalyzer>,
    concurrency: usize,
}

impl Scanner {
    pub fn new(history: GitHistory, analyzer: Arc<dyn CommitAnalyzer>, concurrency: usize) -> Self {
        Self {
            history,
            analyzer,
            concurrency,
        }
    }

    /// Analyze one commit
    ///
    /// Returns `Err` only for errors that would fail every commit.
    pub async fn analyze_commit(&self, commit: Commit) -> Result<CommitReport, ScanError> {
        let description = match self.history.show(&commit.hash).await {
            Ok(description) => description,
            Err(e) if e.is_unavailable() => return Err(ScanError::GitUnavailable(e.to_string())),
            Err(e) => {
                warn!(hash = %commit.hash, error = %e, "Failed to read commit");
                return Ok(CommitReport::failed(commit, e));
            }
        };

        match self.analyzer.analyze(&description).await {
            Ok(response) => {
                let verdict = Verdict::from_response(response);
                debug!(hash = %commit.hash, confidence = ?verdict.confidence, "Commit analyzed");
                Ok(CommitReport::analyzed(commit, verdict))
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(hash = %commit.hash, error = %e, "Analysis failed");
                Ok(CommitReport::failed(commit, e))
            }
        }
    }

    /// Start analyzing `commits`; reports arrive on the queue in completion order
    #[instrument(skip_all, fields(commits = commits.len(), concurrency = self.concurrency))]
    pub fn start(self: Arc<Self>, commits: Vec<Commit>) -> AsyncQueue<CommitReport, ScanError> {
        info!("Starting scan");
        let concurrency = self.concurrency;
        parallel_map_to_queue(concurrency, from_iter(commits), move |commit| {
            let scanner = Arc::clone(&self);
            async move { scanner.analyze_commit(commit).await }
        })
    }
}

/// Drain a report queue, keeping the `top` highest-confidence reports
///
/// `on_report` sees every report in arrival order. A terminal queue error is
/// returned after the reports that preceded it were handed out.
pub async fn collect_reports<F>(
    reports: AsyncQueue<CommitReport, ScanError>,
    top: usize,
    mut on_report: F,
) -> Result<ScanSummary, ScanError>
where
    F: FnMut(&CommitReport),
{
    let mut bucket = TopResultsBucket::new(top, confidence_of);
    let mut analyzed = 0;
    let mut failed = 0;

    let mut stream = Box::pin(reports.into_stream());
    while let Some(report) = stream.next().await {
        let report = report?;
        on_report(&report);

        analyzed += 1;
        if report.error.is_some() {
            failed += 1;
        }
        if report.is_candidate() {
            bucket.add(report);
        }
    }

    info!(analyzed, failed, "Scan complete");
    Ok(ScanSummary {
        analyzed,
        failed,
        top: bucket.into_items(),
    })
}
