// Feed source — fetching and parsing RSS/Atom feeds and article pages.

pub mod fetcher;
pub mod html;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use fetcher::HttpFeedSource;

/// One entry from a parsed feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub link: String,
    pub title: String,
    /// Description / summary text; empty when the feed has none.
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

/// Everything the pipeline needs from the network side of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse one feed. An error affects only this feed.
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>>;

    /// Whether the article URL answers a HEAD request with 200 and an
    /// HTML content type.
    async fn is_valid_article(&self, url: &str) -> bool;

    /// Paragraph text of the article page; empty on any failure.
    async fn fetch_full_text(&self, url: &str) -> String;
}
