// Error types for history access

use thiserror::Error;

/// Result type alias for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur while reading repository history
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The program could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully
    #[error("{program} exited with code {}: {stderr}", .code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Git subcommand outside the allow-list
    #[error("git command not allowed: {0}")]
    CommandNotAllowed(String),

    /// Revision argument that git would read as an option
    #[error("invalid revision: {0}")]
    InvalidRevision(String),

    /// Output hit the capture limit where a partial result would be wrong
    #[error("{0} output was truncated at the output cap")]
    Truncated(String),

    /// Log output did not match the expected record layout
    #[error("failed to parse git log: {0}")]
    Parse(String),

    /// I/O error while talking to the process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HistoryError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        HistoryError::Parse(msg.into())
    }

    /// Whether the failure is about the git binary itself rather than the repository
    pub fn is_unavailable(&self) -> bool {
        matches!(self, HistoryError::Spawn { .. })
    }
}
