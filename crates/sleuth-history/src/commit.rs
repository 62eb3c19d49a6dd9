// Commit metadata as read from git log

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One commit from the repository history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,

    /// Author date
    pub date: DateTime<FixedOffset>,

    /// Subject line
    pub message: String,

    /// Author name
    pub author_name: String,

    /// Author email
    pub author_email: String,
}

impl Commit {
    /// Author rendered as `Name <email>`
    pub fn author(&self) -> String {
        format!("{} <{}>", self.author_name, self.author_email)
    }

    /// First seven characters of the hash
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}
