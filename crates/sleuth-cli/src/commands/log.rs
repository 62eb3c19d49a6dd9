// Commit listing command

use crate::output::{print_table_header, print_table_row, OutputFormat};
use anyhow::{Context, Result};
use sleuth_history::{Commit, GitHistory};

/// Which commits a command works on
#[derive(Debug, Clone, Default)]
pub struct CommitFilter {
    /// Only commits with this author email
    pub author: Option<String>,
    /// Only the newest N commits
    pub limit: Option<usize>,
}

impl CommitFilter {
    /// Read the matching commits, newest first
    pub async fn read(&self, history: &GitHistory) -> Result<Vec<Commit>> {
        let mut commits = match &self.author {
            Some(email) => history.commits_by_author(email).await,
            None => history.all_commits().await,
        }
        .context("Failed to read commit history")?;

        if let Some(limit) = self.limit {
            commits.truncate(limit);
        }
        Ok(commits)
    }
}

pub async fn run(history: &GitHistory, filter: &CommitFilter, output: OutputFormat) -> Result<()> {
    let commits = filter.read(history).await?;

    if output.is_text() {
        if commits.is_empty() {
            println!("No commits found");
            return Ok(());
        }

        print_table_header(&[("HASH", 10), ("DATE", 25), ("AUTHOR", 24), ("MESSAGE", 50)]);
        for commit in &commits {
            let date = commit.date.to_rfc3339();
            print_table_row(&[
                (commit.short_hash(), 10),
                (&date, 25),
                (&commit.author_name, 24),
                (&commit.message, 50),
            ]);
        }
    } else {
        output.print_value(&serde_json::json!({ "data": commits, "total": commits.len() }))?;
    }

    Ok(())
}
