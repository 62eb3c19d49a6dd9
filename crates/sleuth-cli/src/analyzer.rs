// Commit analysis backends
//
// Design Decision: The analyzer is an external command. The commit description
// goes to its stdin and its stdout is the response, so any model client or
// script can sit behind it.
// Design Decision: Failing to start the analyzer aborts the scan; a failed run
// only fails the one commit.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Shell exit code for "command not found"
const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Errors from a single analysis
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The analyzer cannot run at all
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),

    /// The analyzer ran but produced no usable response
    #[error("analysis failed: {0}")]
    Failed(String),
}

impl AnalysisError {
    /// Whether the error should stop the whole scan
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::Unavailable(_))
    }
}

/// Produces a free-text verdict for a commit description
#[async_trait]
pub trait CommitAnalyzer: Send + Sync {
    async fn analyze(&self, description: &str) -> Result<String, AnalysisError>;
}

/// Analyzer backed by a shell command
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    shell: String,
    command: String,
    timeout: Option<Duration>,
}

impl CommandAnalyzer {
    /// Run `command` through `sh -c`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            shell: "sh".to_string(),
            command: command.into(),
            timeout: None,
        }
    }

    /// Use a different shell
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Fail any single analysis that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(&self, description: &str) -> Result<String, AnalysisError> {
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AnalysisError::Unavailable(format!("{}: {}", self.shell, e)))?;

        let stdin = child.stdin.take();
        let write_input = async move {
            let Some(mut stdin) = stdin else {
                return;
            };
            // The analyzer may exit without reading everything
            if let Err(e) = stdin.write_all(description.as_bytes()).await {
                debug!(error = %e, "Analyzer closed stdin early");
            }
        };

        let (_, output) = tokio::join!(write_input, child.wait_with_output());
        let output =
            output.map_err(|e| AnalysisError::Failed(format!("waiting for analyzer: {e}")))?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(EXIT_COMMAND_NOT_FOUND) => Err(AnalysisError::Unavailable(format!(
                "command not found: {}",
                self.command
            ))),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(AnalysisError::Failed(format!(
                    "exit code {}: {}",
                    code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    stderr.trim()
                )))
            }
        }
    }
}

#[async_trait]
impl CommitAnalyzer for CommandAnalyzer {
    async fn analyze(&self, description: &str) -> Result<String, AnalysisError> {
        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.run(description)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "Analyzer timed out");
                    Err(AnalysisError::Failed(format!(
                        "timed out after {}s",
                        timeout.as_secs()
                    )))
                }
            },
            None => self.run(description).await,
        }
    }
}
