// Composition tests — the forwarding cycle wired end to end.
//
// Every network collaborator is replaced by an in-process fake:
//   FakeFeeds -> Aggregator -> RecordingSink
// with an in-memory SQLite database behind the dedup store, so these tests
// exercise the real classifier, dedup, AI fallback, and message formatting.

#![cfg(feature = "sqlite")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use ivf_news::ai::{AiProcessor, TextGenerator};
use ivf_news::db::models::{MatchPolicy, NewsItem, TIMESTAMP_FORMAT};
use ivf_news::db::sqlite::SqliteDatabase;
use ivf_news::db::Database;
use ivf_news::dedup::DedupStore;
use ivf_news::feed::{FeedEntry, FeedSource};
use ivf_news::pipeline::cycle::LAST_CYCLE_KEY;
use ivf_news::pipeline::{Aggregator, EntryOutcome, PipelineSettings};
use ivf_news::telegram::MessageSink;
use ivf_news::topics::{Embedder, TopicClassifier};

const FEED_A: &str = "https://feeds.example.com/a.xml";
const FEED_B: &str = "https://feeds.example.com/b.xml";
const FEED_DOWN: &str = "https://feeds.example.com/down.xml";

// ============================================================
// Fakes
// ============================================================

#[derive(Default)]
struct FakeFeeds {
    feeds: HashMap<String, Vec<FeedEntry>>,
    broken_articles: Vec<String>,
}

impl FakeFeeds {
    fn with_feed(mut self, url: &str, entries: Vec<FeedEntry>) -> Self {
        self.feeds.insert(url.to_string(), entries);
        self
    }

    fn with_broken_article(mut self, link: &str) -> Self {
        self.broken_articles.push(link.to_string());
        self
    }
}

#[async_trait]
impl FeedSource for FakeFeeds {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        match self.feeds.get(url) {
            Some(entries) => Ok(entries.clone()),
            None => anyhow::bail!("HTTP 503 for {url}"),
        }
    }

    async fn is_valid_article(&self, url: &str) -> bool {
        !self.broken_articles.iter().any(|b| b == url)
    }

    async fn fetch_full_text(&self, _url: &str) -> String {
        String::new()
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<()> {
        if self.fail {
            anyhow::bail!("Telegram API error 400: Bad Request: chat not found");
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Every text maps to the same vector, so any two items look identical.
struct ConstantEmbedder;

#[async_trait]
impl Embedder for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f64>> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

struct CannedGenerator(&'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

// ============================================================
// Helpers
// ============================================================

fn entry(link: &str, title: &str, summary: &str) -> FeedEntry {
    FeedEntry {
        link: link.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        published: None,
        image_url: None,
    }
}

fn ivf_entry(link: &str) -> FeedEntry {
    entry(
        link,
        "New IVF protocol doubles success rates",
        "Researchers report better embryo selection.",
    )
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        feed_delay: Duration::ZERO,
        ..Default::default()
    }
}

struct Harness {
    db: Arc<dyn Database>,
    sink: Arc<RecordingSink>,
    aggregator: Aggregator,
}

fn harness_with(
    feeds: FakeFeeds,
    feed_urls: &[&str],
    sink: RecordingSink,
    ai: AiProcessor,
    settings: PipelineSettings,
) -> Harness {
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
    let sink = Arc::new(sink);
    let aggregator = Aggregator::new(
        Arc::clone(&db),
        DedupStore::new(Arc::clone(&db), MatchPolicy::Link),
        TopicClassifier::new().unwrap(),
        Arc::new(feeds),
        Arc::clone(&sink) as Arc<dyn MessageSink>,
        ai,
        feed_urls.iter().map(|s| s.to_string()).collect(),
        settings,
    );
    Harness { db, sink, aggregator }
}

fn no_ai() -> AiProcessor {
    let mut ai = AiProcessor::new(None, "ru").unwrap();
    ai.initialize();
    ai
}

fn harness(feeds: FakeFeeds, feed_urls: &[&str]) -> Harness {
    harness_with(feeds, feed_urls, RecordingSink::default(), no_ai(), settings())
}

// ============================================================
// Filtering and delivery
// ============================================================

#[tokio::test]
async fn relevant_entries_are_forwarded_and_the_rest_filtered() {
    let feeds = FakeFeeds::default().with_feed(
        FEED_A,
        vec![
            ivf_entry("https://news.example.com/ivf"),
            entry("https://news.example.com/football", "Local team wins the cup", ""),
            entry("https://news.example.com/politics", "Путин обсудил программу ЭКО", ""),
        ],
    );
    let mut h = harness(feeds, &[FEED_A]);

    let report = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(report.feeds_processed, 1);
    assert_eq!(report.entries_seen, 3);
    assert_eq!(report.forwarded, 1);
    assert_eq!(report.filtered, 2);

    let sent = h.sink.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("<b>ЭКО</b>"), "glossary applied: {}", sent[0]);
    assert!(sent[0].ends_with("<a href=\"https://news.example.com/ivf\">Источник</a>"));

    // Only the forwarded item is recorded.
    assert_eq!(h.db.count_seen_items().await.unwrap(), 1);
    assert_eq!(h.db.count_news_items().await.unwrap(), 1);
    assert!(h.db.get_scan_state(LAST_CYCLE_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn second_cycle_forwards_nothing_new() {
    let feeds = FakeFeeds::default().with_feed(FEED_A, vec![ivf_entry("https://news.example.com/ivf")]);
    let mut h = harness(feeds, &[FEED_A]);

    h.aggregator.run_cycle().await.unwrap();
    let second = h.aggregator.run_cycle().await.unwrap();

    assert_eq!(second.forwarded, 0);
    assert_eq!(second.already_seen, 1);
    assert_eq!(h.sink.messages().len(), 1);
}

#[tokio::test]
async fn tracking_variant_in_another_feed_is_already_seen() {
    let feeds = FakeFeeds::default()
        .with_feed(FEED_A, vec![ivf_entry("https://news.example.com/ivf")])
        .with_feed(
            FEED_B,
            vec![ivf_entry("https://www.news.example.com/ivf?utm_source=rss&fbclid=1")],
        );
    let mut h = harness(feeds, &[FEED_A, FEED_B]);

    let report = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(report.forwarded, 1);
    assert_eq!(report.already_seen, 1);
}

#[tokio::test]
async fn invalid_article_is_neither_sent_nor_recorded() {
    let link = "https://news.example.com/gone";
    let feeds = FakeFeeds::default()
        .with_feed(FEED_A, vec![ivf_entry(link)])
        .with_broken_article(link);
    let mut h = harness(feeds, &[FEED_A]);

    let outcome = h.aggregator.process_entry(&ivf_entry(link)).await.unwrap();
    assert_eq!(outcome, EntryOutcome::InvalidArticle);
    assert!(h.sink.messages().is_empty());
    assert_eq!(h.db.count_seen_items().await.unwrap(), 0);
}

// ============================================================
// Cycle limits and isolation
// ============================================================

#[tokio::test]
async fn failing_feed_does_not_abort_the_cycle() {
    let feeds = FakeFeeds::default().with_feed(FEED_A, vec![ivf_entry("https://news.example.com/ivf")]);
    let mut h = harness(feeds, &[FEED_DOWN, FEED_A]);

    let report = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(report.feeds_failed, 1);
    assert_eq!(report.feeds_processed, 1);
    assert_eq!(report.forwarded, 1);
}

#[tokio::test]
async fn per_cycle_cap_stops_forwarding() {
    let feeds = FakeFeeds::default()
        .with_feed(
            FEED_A,
            vec![
                entry("https://news.example.com/1", "IVF study one", "Embryo research"),
                entry("https://news.example.com/2", "IVF study two", "Oocyte research"),
            ],
        )
        .with_feed(
            FEED_B,
            vec![entry("https://news.example.com/3", "IVF study three", "Blastocyst research")],
        );
    let settings = PipelineSettings {
        max_news_per_cycle: 2,
        ..settings()
    };
    let mut h = harness_with(feeds, &[FEED_A, FEED_B], RecordingSink::default(), no_ai(), settings);

    let report = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(report.forwarded, 2);
    assert!(report.cap_reached);
    assert_eq!(h.sink.messages().len(), 2);

    // The capped entry is still new for the next cycle.
    let next = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(next.forwarded, 1);
}

#[tokio::test]
async fn delivery_failure_is_recorded_and_not_retried_next_cycle() {
    let feeds = FakeFeeds::default().with_feed(FEED_A, vec![ivf_entry("https://news.example.com/ivf")]);
    let mut h = harness_with(feeds, &[FEED_A], RecordingSink::failing(), no_ai(), settings());

    let first = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(first.delivery_failures, 1);
    assert_eq!(first.forwarded, 0);

    let second = h.aggregator.run_cycle().await.unwrap();
    assert_eq!(second.already_seen, 1);
    assert_eq!(second.delivery_failures, 0);
}

// ============================================================
// Duplicate detection beyond the link
// ============================================================

#[tokio::test]
async fn same_story_from_another_outlet_is_a_semantic_duplicate() {
    let feeds = FakeFeeds::default().with_feed(
        FEED_A,
        vec![
            ivf_entry("https://outlet-one.example.com/ivf"),
            entry(
                "https://outlet-two.example.com/story",
                "IVF protocol shows doubled success",
                "Embryo selection improves outcomes.",
            ),
        ],
    );
    let feed_urls = [FEED_A];
    let h = harness(feeds, &feed_urls);
    let mut aggregator = h
        .aggregator
        .with_embedder(Arc::new(ConstantEmbedder), Duration::from_secs(1800));

    let report = aggregator.run_cycle().await.unwrap();
    assert_eq!(report.forwarded, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(h.sink.messages().len(), 1);
}

#[tokio::test]
async fn embedding_window_follows_retention_days() {
    let feeds = FakeFeeds::default()
        .with_feed(FEED_A, vec![ivf_entry("https://outlet-two.example.com/story")]);
    let settings = PipelineSettings {
        retention_days: 60,
        ..settings()
    };
    let h = harness_with(feeds, &[FEED_A], RecordingSink::default(), no_ai(), settings);

    let stored_at = (chrono::Utc::now() - chrono::Duration::days(45))
        .format(TIMESTAMP_FORMAT)
        .to_string();
    h.db.insert_news_item(&NewsItem {
        id: "older-story".to_string(),
        url: "https://outlet-one.example.com/story".to_string(),
        title: "IVF protocol doubles success".to_string(),
        original_text: "IVF text".to_string(),
        summary: "older summary".to_string(),
        image_url: None,
        embedding: Some(vec![1.0, 0.0, 0.0]),
        summary_embedding: None,
        published_at: stored_at,
    })
    .await
    .unwrap();

    let mut aggregator = h
        .aggregator
        .with_embedder(Arc::new(ConstantEmbedder), Duration::from_secs(1800));
    let report = aggregator.run_cycle().await.unwrap();

    assert_eq!(report.duplicates, 1);
    assert_eq!(report.forwarded, 0);
    assert!(h.sink.messages().is_empty());
    // Still inside the 60-day window, so the sweep keeps it.
    assert_eq!(h.db.count_news_items().await.unwrap(), 1);
}

#[tokio::test]
async fn identical_summary_under_a_new_link_is_dropped() {
    let feeds = FakeFeeds::default();
    let mut h = harness(feeds, &[]);

    let first = h
        .aggregator
        .process_entry(&ivf_entry("https://outlet-one.example.com/ivf"))
        .await
        .unwrap();
    let second = h
        .aggregator
        .process_entry(&ivf_entry("https://outlet-two.example.com/ivf"))
        .await
        .unwrap();

    assert_eq!(first, EntryOutcome::Forwarded);
    assert_eq!(second, EntryOutcome::SummaryDuplicate);
}

// ============================================================
// AI rewrite
// ============================================================

#[tokio::test]
async fn rewritten_text_is_posted_when_ai_is_ready() {
    let generator: Arc<dyn TextGenerator> =
        Arc::new(CannedGenerator("<b>Новое в ЭКО</b>\n\nУчёные улучшили отбор эмбрионов."));
    let mut ai = AiProcessor::new(Some(generator), "ru").unwrap();
    ai.initialize();

    let feeds = FakeFeeds::default().with_feed(FEED_A, vec![ivf_entry("https://news.example.com/ivf")]);
    let mut h = harness_with(feeds, &[FEED_A], RecordingSink::default(), ai, settings());

    h.aggregator.run_cycle().await.unwrap();
    let sent = h.sink.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("<b>Новое в ЭКО</b>"));
    assert!(sent[0].contains("Источник"));
}
