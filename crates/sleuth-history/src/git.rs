// Git history reader
//
// Design Decision: Log output uses ASCII unit/record separators so subjects with
// arbitrary punctuation parse without quoting rules.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::DateTime;
use tracing::{debug, instrument};

use crate::commit::Commit;
use crate::error::{HistoryError, Result};
use crate::runner::{ProcessOutput, ProcessRunner};

/// Git subcommands allowed through [`GitHistory::run_git`] by default
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &["log", "show", "show-ref"];

const FIELD_SEPARATOR: char = '\x1f';
const RECORD_SEPARATOR: char = '\x1e';
const LOG_FORMAT: &str = "--format=%H%x1f%aI%x1f%an%x1f%ae%x1f%s%x1e";

/// Appended to `show` output cut off at the capture limit
pub const TRUNCATION_NOTICE: &str = "(Output was truncated because it was too long)";

/// Reads commit history of one repository
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use sleuth_history::{GitHistory, TokioProcessRunner};
///
/// let history = GitHistory::new(Arc::new(TokioProcessRunner::new()), "/path/to/repo");
/// for commit in history.all_commits().await? {
///     println!("{} {}", commit.short_hash(), commit.message);
/// }
/// ```
#[derive(Clone)]
pub struct GitHistory {
    runner: Arc<dyn ProcessRunner>,
    workdir: PathBuf,
    program: String,
    allowed_commands: Vec<String>,
}

impl std::fmt::Debug for GitHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHistory")
            .field("workdir", &self.workdir)
            .field("program", &self.program)
            .field("allowed_commands", &self.allowed_commands)
            .finish()
    }
}

impl GitHistory {
    /// Create a reader for the repository at `workdir`
    pub fn new(runner: Arc<dyn ProcessRunner>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
            program: "git".to_string(),
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// Use a different git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the subcommand allow-list for [`GitHistory::run_git`]
    pub fn with_allowed_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Repository directory
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run an allow-listed git subcommand
    pub async fn run_git(&self, args: &[String]) -> Result<ProcessOutput> {
        let subcommand = args.first().map(String::as_str).unwrap_or_default();
        if !self.allowed_commands.iter().any(|c| c == subcommand) {
            return Err(HistoryError::CommandNotAllowed(subcommand.to_string()));
        }
        self.git(args).await
    }

    /// Every commit reachable from HEAD, newest first
    ///
    /// Fails with [`HistoryError::Truncated`] rather than returning a partial
    /// history when the output cap cut the log short.
    #[instrument(skip(self), fields(workdir = %self.workdir.display()))]
    pub async fn all_commits(&self) -> Result<Vec<Commit>> {
        let output = self.git(&["log".to_string(), LOG_FORMAT.to_string()]).await?;
        if output.truncated {
            return Err(HistoryError::Truncated("git log".to_string()));
        }
        let commits = parse_log(&output.stdout)?;
        debug!(count = commits.len(), "Read commit history");
        Ok(commits)
    }

    /// Commits whose author email matches exactly
    pub async fn commits_by_author(&self, email: &str) -> Result<Vec<Commit>> {
        let commits = self.all_commits().await?;
        Ok(commits
            .into_iter()
            .filter(|c| c.author_email == email)
            .collect())
    }

    /// Unique authors as `Name <email>`, in first-seen order
    pub async fn all_authors(&self) -> Result<Vec<String>> {
        let commits = self.all_commits().await?;
        let mut seen = HashSet::new();
        Ok(commits
            .iter()
            .map(Commit::author)
            .filter(|author| seen.insert(author.clone()))
            .collect())
    }

    /// Full `git show` output for one commit
    ///
    /// Output cut off at the capture limit ends with [`TRUNCATION_NOTICE`].
    pub async fn show(&self, hash: &str) -> Result<String> {
        if hash.is_empty() || hash.starts_with('-') {
            return Err(HistoryError::InvalidRevision(hash.to_string()));
        }
        let output = self.git(&["show".to_string(), hash.to_string()]).await?;
        if output.truncated {
            debug!(hash, "Commit description truncated");
            return Ok(format!("{}\n{}", output.stdout, TRUNCATION_NOTICE));
        }
        Ok(output.stdout)
    }

    async fn git(&self, args: &[String]) -> Result<ProcessOutput> {
        self.runner.run(&self.program, args, &self.workdir).await
    }
}

/// Parse log output produced with the unit/record separator format
pub fn parse_log(output: &str) -> Result<Vec<Commit>> {
    output
        .split(RECORD_SEPARATOR)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<Commit> {
    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    let [hash, date, author_name, author_email, message] = fields.as_slice() else {
        return Err(HistoryError::parse(format!(
            "expected 5 fields, found {} in {:?}",
            fields.len(),
            record
        )));
    };

    let date = DateTime::parse_from_rfc3339(date)
        .map_err(|e| HistoryError::parse(format!("bad date {date:?} for {hash}: {e}")))?;

    Ok(Commit {
        hash: hash.to_string(),
        date,
        message: message.trim_end().to_string(),
        author_name: author_name.to_string(),
        author_email: author_email.to_string(),
    })
}
