// HTTP feed source backed by reqwest + feed-rs.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::parser;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::html::{extract_paragraphs, fragment_text};
use super::{FeedEntry, FeedSource};
use crate::ai::fallback::truncate_chars;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; IVF-News-Aggregator/1.0)";

/// Title and description caps applied at parse time.
const MAX_TITLE_CHARS: usize = 512;
const MAX_SUMMARY_CHARS: usize = 5000;

pub struct HttpFeedSource {
    client: Client,
}

/// Whether a feed response's content type looks like XML / RSS.
pub fn is_feed_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("xml") || ct.contains("rss")
}

/// Parse an RSS/Atom document into entries. Entries without a link are
/// dropped.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(bytes).context("Failed to parse feed")?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.trim().to_string())?;
            if link.is_empty() {
                return None;
            }
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let summary = entry
                .summary
                .map(|s| fragment_text(&s.content))
                .unwrap_or_default();
            let image_url = entry
                .media
                .iter()
                .flat_map(|m| m.content.iter())
                .find_map(|c| c.url.as_ref().map(|u| u.to_string()));

            Some(FeedEntry {
                link,
                title: truncate_chars(title.trim(), MAX_TITLE_CHARS).to_string(),
                summary: truncate_chars(summary.trim(), MAX_SUMMARY_CHARS).to_string(),
                published: entry.published.or(entry.updated),
                image_url,
            })
        })
        .collect())
}

impl HttpFeedSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/rss+xml, application/atom+xml, text/xml;q=0.9")
            .send()
            .await
            .with_context(|| format!("Failed to fetch feed {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Feed {} returned HTTP {}", url, response.status());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_feed_content_type(&content_type) {
            anyhow::bail!("Feed {} has unexpected content type {:?}", url, content_type);
        }

        let bytes = response.bytes().await?;
        let entries = parse_entries(&bytes[..]).with_context(|| format!("Feed {url}"))?;
        debug!(feed = %url, entries = entries.len(), "Fetched feed");
        Ok(entries)
    }

    async fn is_valid_article(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => {
                let is_html = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"));
                response.status() == StatusCode::OK && is_html
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Invalid article URL");
                false
            }
        }
    }

    async fn fetch_full_text(&self, url: &str) -> String {
        let result = async {
            let response = self
                .client
                .get(url)
                .timeout(Duration::from_secs(15))
                .send()
                .await?
                .error_for_status()?;
            Ok::<String, anyhow::Error>(response.text().await?)
        }
        .await;

        match result {
            Ok(body) => extract_paragraphs(&body),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to extract full text");
                String::new()
            }
        }
    }
}
