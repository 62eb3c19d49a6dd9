//! # Sleuth History
//!
//! Reads git commit metadata for a repository given explicitly by path.
//! Everything that touches a process goes through [`ProcessRunner`], so the
//! reader can be driven by [`ScriptedRunner`] in tests.

pub mod commit;
pub mod error;
pub mod git;
pub mod runner;

pub use commit::Commit;
pub use error::{HistoryError, Result};
pub use git::{parse_log, GitHistory, DEFAULT_ALLOWED_COMMANDS, TRUNCATION_NOTICE};
pub use runner::{ProcessOutput, ProcessRunner, ScriptedRunner, TokioProcessRunner};
