// Author listing command

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use sleuth_history::GitHistory;

pub async fn run(history: &GitHistory, output: OutputFormat) -> Result<()> {
    let authors = history
        .all_authors()
        .await
        .context("Failed to read commit history")?;

    if output.is_text() {
        if authors.is_empty() {
            println!("No authors found");
        }
        for author in &authors {
            println!("{}", author);
        }
    } else {
        output.print_value(&serde_json::json!({ "data": authors, "total": authors.len() }))?;
    }

    Ok(())
}
