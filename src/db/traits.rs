// Database trait — backend-agnostic async interface for all DB operations.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx).
// All methods are async so both sync (rusqlite via Mutex) and native async
// (sqlx) backends fit behind a single interface.
//
// Uniqueness of seen items is enforced by the backend's own
// insert-or-ignore primitive, never by a read followed by a write.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{MatchPolicy, NewsItem, SeenItem};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Scan state ---

    /// Get a scan state value by key (e.g., "last_cycle_at").
    async fn get_scan_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a scan state value (upsert).
    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Seen items ---

    /// Whether a row matches the candidate under the given policy.
    async fn seen_item_exists(
        &self,
        normalized_link: &str,
        title_hash: &str,
        policy: MatchPolicy,
    ) -> Result<bool>;

    /// Insert-if-absent on `(normalized_link, title_hash)`.
    /// Returns `false` when the key already existed.
    async fn insert_seen_item(
        &self,
        normalized_link: &str,
        original_link: &str,
        title: &str,
        title_hash: &str,
    ) -> Result<bool>;

    /// Insert-if-absent keeping the row's own `published_at` (used by migration).
    async fn insert_seen_item_raw(&self, item: &SeenItem) -> Result<bool>;

    /// Most recent seen items, newest first.
    async fn get_seen_items(&self, limit: u32) -> Result<Vec<SeenItem>>;

    async fn count_seen_items(&self) -> Result<i64>;

    /// Delete seen items older than `max_age_days`. Returns the number removed.
    async fn purge_seen_items(&self, max_age_days: i64) -> Result<u64>;

    // --- News items ---

    async fn news_item_exists(&self, id: &str) -> Result<bool>;

    /// Insert-if-absent on `id`. Returns `false` when the row already existed.
    async fn insert_news_item(&self, item: &NewsItem) -> Result<bool>;

    /// Whether a stored item has exactly this summary text.
    async fn summary_exists(&self, summary: &str) -> Result<bool>;

    /// `(id, embedding)` pairs for items published within `max_age_days`.
    /// Rows without an embedding are skipped.
    async fn get_recent_embeddings(&self, max_age_days: i64) -> Result<Vec<(String, Vec<f64>)>>;

    /// Most recent news items, newest first.
    async fn get_recent_news(&self, limit: u32) -> Result<Vec<NewsItem>>;

    async fn count_news_items(&self) -> Result<i64>;

    /// Delete news items older than `max_age_days`. Returns the number removed.
    async fn purge_news_items(&self, max_age_days: i64) -> Result<u64>;
}
