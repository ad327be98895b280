// Polling cycle: feeds -> relevance -> novelty -> AI -> Telegram.
//
// For each entry of each configured feed:
// 1. Skip links already recorded in seen_items
// 2. Check the title + description against the topic vocabulary
// 3. Validate the article URL and pull its paragraph text
// 4. Re-check relevance on the combined text
// 5. Drop semantic near-duplicates of recent items (when embeddings are on)
// 6. Rewrite the text, drop exact summary duplicates
// 7. Record the item, then post it
//
// Cycles never overlap. Within a cycle feeds run one at a time with a fixed
// delay between them, stopping early at the forwarded-item cap or when the
// wall-clock budget runs out. No single feed or entry can abort the cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::ai::fallback::truncate_chars;
use crate::ai::processor::{AiProcessor, MAX_TEXT_LENGTH};
use crate::config::Config;
use crate::db::models::{NewsItem, TIMESTAMP_FORMAT};
use crate::db::Database;
use crate::dedup::store::DEFAULT_RETENTION_DAYS;
use crate::dedup::{news_id, normalize_url, DedupStore};
use crate::feed::{FeedEntry, FeedSource};
use crate::telegram::{build_message, MessageSink};
use crate::topics::embeddings::{
    Embedder, EmbeddingCache, DEFAULT_REFRESH_INTERVAL, DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::topics::{Relevance, TopicClassifier};

/// Scan state key holding the end time of the last completed cycle.
pub const LAST_CYCLE_KEY: &str = "last_cycle_at";

pub const STARTUP_MESSAGE: &str = "🤖 IVF News Aggregator started successfully!";

/// Shortest pause between cycles, however long the last one took.
const MIN_SLEEP: Duration = Duration::from_secs(60);

/// Tunables for one aggregator instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub check_interval: Duration,
    pub max_news_per_cycle: usize,
    pub cycle_budget: Duration,
    pub feed_delay: Duration,
    pub retention_days: i64,
    pub similarity_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1800),
            max_news_per_cycle: 10,
            cycle_budget: Duration::from_secs(1500),
            feed_delay: Duration::from_secs(1),
            retention_days: DEFAULT_RETENTION_DAYS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            check_interval: config.check_interval,
            max_news_per_cycle: config.max_news_per_cycle,
            cycle_budget: config.cycle_budget,
            feed_delay: config.feed_delay,
            retention_days: config.retention_days,
            similarity_threshold: config.similarity_threshold,
        }
    }
}

/// What happened to a single feed entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Forwarded,
    AlreadySeen,
    Irrelevant,
    Vetoed,
    InvalidArticle,
    SemanticDuplicate { matched_id: String, similarity: f64 },
    SummaryDuplicate,
    /// Recorded, but Telegram rejected or never accepted the message.
    DeliveryFailed,
}

/// Counters for one cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    pub feeds_processed: usize,
    pub feeds_failed: usize,
    pub entries_seen: usize,
    pub forwarded: usize,
    pub already_seen: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub delivery_failures: usize,
    pub swept: u64,
    pub cap_reached: bool,
    pub budget_exhausted: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Forwarded => self.forwarded += 1,
            EntryOutcome::AlreadySeen => self.already_seen += 1,
            EntryOutcome::Irrelevant | EntryOutcome::Vetoed | EntryOutcome::InvalidArticle => {
                self.filtered += 1
            }
            EntryOutcome::SemanticDuplicate { .. } | EntryOutcome::SummaryDuplicate => {
                self.duplicates += 1
            }
            EntryOutcome::DeliveryFailed => self.delivery_failures += 1,
        }
    }
}

/// The forwarder with all collaborators injected.
pub struct Aggregator {
    db: Arc<dyn Database>,
    store: DedupStore,
    classifier: TopicClassifier,
    feeds: Arc<dyn FeedSource>,
    sink: Arc<dyn MessageSink>,
    ai: AiProcessor,
    embedder: Option<Arc<dyn Embedder>>,
    cache: EmbeddingCache,
    feed_urls: Vec<String>,
    settings: PipelineSettings,
}

impl Aggregator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<dyn Database>,
        store: DedupStore,
        classifier: TopicClassifier,
        feeds: Arc<dyn FeedSource>,
        sink: Arc<dyn MessageSink>,
        ai: AiProcessor,
        feed_urls: Vec<String>,
        settings: PipelineSettings,
    ) -> Self {
        let cache = EmbeddingCache::new(DEFAULT_REFRESH_INTERVAL, settings.retention_days);
        Self {
            db,
            store,
            classifier,
            feeds,
            sink,
            ai,
            embedder: None,
            cache,
            feed_urls,
            settings,
        }
    }

    /// Turn on semantic duplicate detection. Stored items are compared for
    /// as long as they are retained.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>, refresh: Duration) -> Self {
        self.embedder = Some(embedder);
        self.cache = EmbeddingCache::new(refresh, self.settings.retention_days);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one polling cycle over every configured feed.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let started = Instant::now();
        let mut report = CycleReport::default();
        let feed_urls = self.feed_urls.clone();
        info!(feeds = feed_urls.len(), "Processing cycle started");

        for (i, url) in feed_urls.iter().enumerate() {
            if report.forwarded >= self.settings.max_news_per_cycle {
                info!(
                    max = self.settings.max_news_per_cycle,
                    "Max news per cycle reached, skipping remaining feeds"
                );
                report.cap_reached = true;
                break;
            }
            if started.elapsed() >= self.settings.cycle_budget {
                warn!(
                    budget_secs = self.settings.cycle_budget.as_secs(),
                    remaining_feeds = feed_urls.len() - i,
                    "Cycle time budget exhausted, stopping early"
                );
                report.budget_exhausted = true;
                break;
            }

            if i > 0 && !self.settings.feed_delay.is_zero() {
                tokio::time::sleep(self.settings.feed_delay).await;
            }

            let entries = match self.feeds.fetch_feed(url).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(feed = %url, error = %e, "Feed failed, skipping");
                    report.feeds_failed += 1;
                    continue;
                }
            };
            report.feeds_processed += 1;

            let before = report.forwarded;
            for entry in &entries {
                if report.forwarded >= self.settings.max_news_per_cycle {
                    report.cap_reached = true;
                    break;
                }
                report.entries_seen += 1;
                match self.process_entry(entry).await {
                    Ok(outcome) => report.record(&outcome),
                    Err(e) => error!(link = %entry.link, error = %e, "Entry processing error"),
                }
            }
            info!(feed = %url, new = report.forwarded - before, "Feed processed");
        }

        match self.store.sweep(self.settings.retention_days).await {
            Ok(swept) => report.swept = swept,
            Err(e) => warn!(error = %e, "Retention sweep failed"),
        }

        let finished_at = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
        if let Err(e) = self.db.set_scan_state(LAST_CYCLE_KEY, &finished_at).await {
            warn!(error = %e, "Failed to record cycle time");
        }

        info!(
            forwarded = report.forwarded,
            seen = report.entries_seen,
            failed_feeds = report.feeds_failed,
            swept = report.swept,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Cycle completed"
        );
        Ok(report)
    }

    /// Run one entry through every filter and, if it survives, post it.
    pub async fn process_entry(&mut self, entry: &FeedEntry) -> Result<EntryOutcome> {
        let title = entry.title.trim();
        let title_preview = truncate_chars(title, 50);

        if !self.store.is_new(&entry.link, title).await {
            return Ok(EntryOutcome::AlreadySeen);
        }

        let preview = format!("{} {}", title, entry.summary);
        match self.classifier.classify(&preview) {
            Relevance::Relevant(term) => debug!(title = %title_preview, term = %term, "Preview relevant"),
            Relevance::Vetoed(term) => {
                debug!(title = %title_preview, stop_term = %term, "Vetoed by stop list");
                return Ok(EntryOutcome::Vetoed);
            }
            Relevance::Irrelevant => return Ok(EntryOutcome::Irrelevant),
        }

        if !self.feeds.is_valid_article(&entry.link).await {
            return Ok(EntryOutcome::InvalidArticle);
        }

        let full_text = self.feeds.fetch_full_text(&entry.link).await;
        let title = if title.is_empty() { "Без названия" } else { title };
        let combined = format!("{}\n\n{}\n\n{}", title, entry.summary, full_text);
        let combined = truncate_chars(&combined, MAX_TEXT_LENGTH).to_string();

        if !self.classifier.is_relevant(&combined) {
            info!(title = %title_preview, "Skipped non-IVF article");
            return Ok(EntryOutcome::Irrelevant);
        }

        let embedding = self.embed(&combined).await;
        if let Some(embedding) = &embedding {
            if let Some(m) = self
                .cache
                .find_duplicate(embedding, self.settings.similarity_threshold)
            {
                info!(
                    title = %title_preview,
                    similar_to = %m.id,
                    similarity = m.similarity,
                    "Duplicate by full text"
                );
                return Ok(EntryOutcome::SemanticDuplicate {
                    matched_id: m.id,
                    similarity: m.similarity,
                });
            }
        }

        let processed = self.ai.process_content(&combined).await;
        match self.db.summary_exists(&processed.text).await {
            Ok(true) => {
                info!(title = %title_preview, "Duplicate by summary");
                return Ok(EntryOutcome::SummaryDuplicate);
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Summary duplicate check failed, continuing"),
        }
        let summary_embedding = self.embed(&processed.text).await;

        // Record before sending so a message Telegram keeps rejecting is not
        // retried every cycle.
        if let Err(e) = self.store.save(&entry.link, title).await {
            warn!(link = %entry.link, error = %e, "Failed to record seen item");
        }
        let id = news_id(&normalize_url(&entry.link));
        let published_at = entry
            .published
            .unwrap_or_else(chrono::Utc::now)
            .format(TIMESTAMP_FORMAT)
            .to_string();
        let item = NewsItem {
            id: id.clone(),
            url: entry.link.clone(),
            title: title.to_string(),
            original_text: combined,
            summary: processed.text.clone(),
            image_url: entry.image_url.clone(),
            embedding: embedding.clone(),
            summary_embedding,
            published_at,
        };
        if let Err(e) = self.db.insert_news_item(&item).await {
            warn!(link = %entry.link, error = %e, "Failed to store news item");
        }
        if let Some(embedding) = embedding {
            self.cache.push(id, embedding);
        }

        let message = build_message(&processed.text, &entry.link);
        match self.sink.send(&message).await {
            Ok(()) => {
                info!(title = %title_preview, rewritten = processed.rewritten, "News forwarded");
                Ok(EntryOutcome::Forwarded)
            }
            Err(e) => {
                error!(link = %entry.link, error = %e, "Failed to send news, dropping");
                Ok(EntryOutcome::DeliveryFailed)
            }
        }
    }

    /// Embedding for `text`, refreshing the cache first when due. `None`
    /// when embeddings are off or the call fails.
    async fn embed(&mut self, text: &str) -> Option<Vec<f64>> {
        let embedder = self.embedder.clone()?;
        if let Err(e) = self.cache.refresh_if_due(self.db.as_ref()).await {
            warn!(error = %e, "Embedding cache refresh failed");
        }
        match embedder.embed(text).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Embedding failed, skipping semantic check");
                None
            }
        }
    }

    /// Post the startup notice, then run cycles forever.
    pub async fn run_forever(&mut self) -> Result<()> {
        info!(feeds = self.feed_urls.len(), ai = ?self.ai.state(), "Starting IVF news aggregator");
        if let Err(e) = self.sink.send(STARTUP_MESSAGE).await {
            error!(error = %e, "Failed to send startup message to Telegram");
        }

        loop {
            let started = Instant::now();
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "Cycle failed");
            }
            let sleep = next_sleep(self.settings.check_interval, started.elapsed());
            info!(sleep_secs = sleep.as_secs(), "Sleeping until next cycle");
            tokio::time::sleep(sleep).await;
        }
    }
}

/// `max(interval - elapsed, 60 s)`.
pub fn next_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(MIN_SLEEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_sleep() {
        let interval = Duration::from_secs(1800);
        assert_eq!(next_sleep(interval, Duration::from_secs(300)), Duration::from_secs(1500));
        assert_eq!(next_sleep(interval, Duration::from_secs(1790)), MIN_SLEEP);
        assert_eq!(next_sleep(interval, Duration::from_secs(4000)), MIN_SLEEP);
    }

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = CycleReport::default();
        report.record(&EntryOutcome::Forwarded);
        report.record(&EntryOutcome::Vetoed);
        report.record(&EntryOutcome::SummaryDuplicate);
        report.record(&EntryOutcome::SemanticDuplicate {
            matched_id: "x".to_string(),
            similarity: 0.9,
        });
        assert_eq!(report.forwarded, 1);
        assert_eq!(report.filtered, 1);
        assert_eq!(report.duplicates, 2);
    }
}
