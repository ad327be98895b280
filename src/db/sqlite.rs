// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.
//
// The free functions in queries.rs hold the SQL so unit tests can run
// against a Connection directly.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{MatchPolicy, NewsItem, SeenItem};
use super::queries;
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Fresh in-memory database with all tables created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::create_tables(&conn)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        queries::get_scan_state(&conn, key)
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::set_scan_state(&conn, key, value)
    }

    async fn seen_item_exists(
        &self,
        normalized_link: &str,
        title_hash: &str,
        policy: MatchPolicy,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::seen_item_exists(&conn, normalized_link, title_hash, policy)
    }

    async fn insert_seen_item(
        &self,
        normalized_link: &str,
        original_link: &str,
        title: &str,
        title_hash: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::insert_seen_item(&conn, normalized_link, original_link, title, title_hash)
    }

    async fn insert_seen_item_raw(&self, item: &SeenItem) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::insert_seen_item_raw(&conn, item)
    }

    async fn get_seen_items(&self, limit: u32) -> Result<Vec<SeenItem>> {
        let conn = self.conn.lock().await;
        queries::get_seen_items(&conn, limit)
    }

    async fn count_seen_items(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::count_seen_items(&conn)
    }

    async fn purge_seen_items(&self, max_age_days: i64) -> Result<u64> {
        let conn = self.conn.lock().await;
        queries::purge_seen_items(&conn, max_age_days)
    }

    async fn news_item_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::news_item_exists(&conn, id)
    }

    async fn insert_news_item(&self, item: &NewsItem) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::insert_news_item(&conn, item)
    }

    async fn summary_exists(&self, summary: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::summary_exists(&conn, summary)
    }

    async fn get_recent_embeddings(&self, max_age_days: i64) -> Result<Vec<(String, Vec<f64>)>> {
        let conn = self.conn.lock().await;
        queries::get_recent_embeddings(&conn, max_age_days)
    }

    async fn get_recent_news(&self, limit: u32) -> Result<Vec<NewsItem>> {
        let conn = self.conn.lock().await;
        queries::get_recent_news(&conn, limit)
    }

    async fn count_news_items(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::count_news_items(&conn)
    }

    async fn purge_news_items(&self, max_age_days: i64) -> Result<u64> {
        let conn = self.conn.lock().await;
        queries::purge_news_items(&conn, max_age_days)
    }
}
