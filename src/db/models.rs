// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite or sqlx directly.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Timestamp format shared by both backends (`datetime('now')` in SQLite,
/// `to_char(..)` in PostgreSQL).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A link that has already been forwarded.
///
/// Rows are created once, never updated, and removed in bulk by the
/// retention sweep. `(normalized_link, title_hash)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenItem {
    pub normalized_link: String,
    pub original_link: String,
    pub title: String,
    /// SHA-256 hex digest of the trimmed, lower-cased title
    pub title_hash: String,
    /// Insertion time, not the article's own publish date
    pub published_at: String,
}

/// A fully processed article, kept for semantic duplicate detection and
/// exact-summary checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Hash of the normalized URL (see `dedup::hash::news_id`)
    pub id: String,
    pub url: String,
    pub title: String,
    pub original_text: String,
    pub summary: String,
    pub image_url: Option<String>,
    /// Embedding of the full combined text
    pub embedding: Option<Vec<f64>>,
    /// Embedding of the rewritten summary
    pub summary_embedding: Option<Vec<f64>>,
    pub published_at: String,
}

/// Which stored rows count as "already seen" for a candidate.
///
/// `Link` is the default: the canonical URL is the identity. Title edits on
/// the same article stay suppressed, while different outlets syndicating the
/// same headline are left to the semantic duplicate check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// `normalized_link == X`
    #[default]
    Link,
    /// `normalized_link == X AND title_hash == Y`
    LinkAndTitle,
    /// `normalized_link == X OR title_hash == Y`
    LinkOrTitle,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Link => "link",
            MatchPolicy::LinkAndTitle => "link_and_title",
            MatchPolicy::LinkOrTitle => "link_or_title",
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "link" => Ok(MatchPolicy::Link),
            "link_and_title" | "and" => Ok(MatchPolicy::LinkAndTitle),
            "link_or_title" | "or" => Ok(MatchPolicy::LinkOrTitle),
            other => anyhow::bail!(
                "Unknown dedup match policy '{other}' (expected link, link_and_title or link_or_title)"
            ),
        }
    }
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
