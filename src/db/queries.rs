// Database queries — CRUD operations for all SQLite tables.
//
// Every SQLite interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::models::{MatchPolicy, NewsItem, SeenItem};

// --- Scan state ---

/// Get a scan state value by key (e.g., "last_cycle_at").
pub fn get_scan_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM scan_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a scan state value (upsert).
pub fn set_scan_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Seen items ---

/// Check whether a seen item matches under the given policy.
pub fn seen_item_exists(
    conn: &Connection,
    normalized_link: &str,
    title_hash: &str,
    policy: MatchPolicy,
) -> Result<bool> {
    let exists: bool = match policy {
        MatchPolicy::Link => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM seen_items WHERE normalized_link = ?1)",
            params![normalized_link],
            |row| row.get(0),
        )?,
        MatchPolicy::LinkAndTitle => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM seen_items
                           WHERE normalized_link = ?1 AND title_hash = ?2)",
            params![normalized_link, title_hash],
            |row| row.get(0),
        )?,
        MatchPolicy::LinkOrTitle => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM seen_items
                           WHERE normalized_link = ?1 OR title_hash = ?2)",
            params![normalized_link, title_hash],
            |row| row.get(0),
        )?,
    };
    Ok(exists)
}

/// Insert-if-absent. Returns true when a new row was written.
pub fn insert_seen_item(
    conn: &Connection,
    normalized_link: &str,
    original_link: &str,
    title: &str,
    title_hash: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO seen_items (normalized_link, original_link, title, title_hash, published_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT(normalized_link, title_hash) DO NOTHING",
        params![normalized_link, original_link, title, title_hash],
    )?;
    Ok(changed > 0)
}

/// Insert-if-absent, preserving the item's own `published_at`.
pub fn insert_seen_item_raw(conn: &Connection, item: &SeenItem) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO seen_items (normalized_link, original_link, title, title_hash, published_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(normalized_link, title_hash) DO NOTHING",
        params![
            item.normalized_link,
            item.original_link,
            item.title,
            item.title_hash,
            item.published_at,
        ],
    )?;
    Ok(changed > 0)
}

/// Most recent seen items, newest first.
pub fn get_seen_items(conn: &Connection, limit: u32) -> Result<Vec<SeenItem>> {
    let mut stmt = conn.prepare(
        "SELECT normalized_link, original_link, title, title_hash, published_at
         FROM seen_items
         ORDER BY published_at DESC, id DESC
         LIMIT ?1",
    )?;
    let items = stmt
        .query_map(params![limit], |row| {
            Ok(SeenItem {
                normalized_link: row.get(0)?,
                original_link: row.get(1)?,
                title: row.get(2)?,
                title_hash: row.get(3)?,
                published_at: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn count_seen_items(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM seen_items", [], |row| row.get(0))?;
    Ok(count)
}

/// Delete seen items older than `max_age_days`.
pub fn purge_seen_items(conn: &Connection, max_age_days: i64) -> Result<u64> {
    let removed = conn.execute(
        "DELETE FROM seen_items WHERE datetime(published_at) < datetime('now', ?1)",
        params![format!("-{max_age_days} days")],
    )?;
    Ok(removed as u64)
}

// --- News items ---

pub fn news_item_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM news WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert-if-absent on id (or url). Returns true when a new row was written.
pub fn insert_news_item(conn: &Connection, item: &NewsItem) -> Result<bool> {
    let embedding = item
        .embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let summary_embedding = item
        .summary_embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let changed = conn.execute(
        "INSERT INTO news (id, url, title, original_text, summary, image_url,
                           embedding, summary_embedding, published_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT DO NOTHING",
        params![
            item.id,
            item.url,
            item.title,
            item.original_text,
            item.summary,
            item.image_url,
            embedding,
            summary_embedding,
            item.published_at,
        ],
    )?;
    Ok(changed > 0)
}

pub fn summary_exists(conn: &Connection, summary: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM news WHERE summary = ?1)",
        params![summary],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Load `(id, embedding)` pairs for items newer than `max_age_days`.
///
/// Rows with a missing or unparseable embedding are skipped rather than
/// failing the whole load.
pub fn get_recent_embeddings(
    conn: &Connection,
    max_age_days: i64,
) -> Result<Vec<(String, Vec<f64>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, embedding FROM news
         WHERE embedding IS NOT NULL
           AND datetime(published_at) >= datetime('now', ?1)",
    )?;
    let rows = stmt
        .query_map(params![format!("-{max_age_days} days")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut result = Vec::with_capacity(rows.len());
    for (id, json) in rows {
        match serde_json::from_str::<Vec<f64>>(&json) {
            Ok(vec) => result.push((id, vec)),
            Err(e) => debug!(id = %id, error = %e, "Skipping unparseable embedding"),
        }
    }
    Ok(result)
}

/// Most recent news items, newest first.
pub fn get_recent_news(conn: &Connection, limit: u32) -> Result<Vec<NewsItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, title, original_text, summary, image_url,
                embedding, summary_embedding, published_at
         FROM news
         ORDER BY published_at DESC
         LIMIT ?1",
    )?;
    let items = stmt
        .query_map(params![limit], news_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<NewsItem> {
    let embedding: Option<String> = row.get(6)?;
    let summary_embedding: Option<String> = row.get(7)?;
    Ok(NewsItem {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        original_text: row.get(3)?,
        summary: row.get(4)?,
        image_url: row.get(5)?,
        embedding: embedding.and_then(|j| serde_json::from_str(&j).ok()),
        summary_embedding: summary_embedding.and_then(|j| serde_json::from_str(&j).ok()),
        published_at: row.get(8)?,
    })
}

pub fn count_news_items(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM news", [], |row| row.get(0))?;
    Ok(count)
}

/// Delete news items older than `max_age_days`.
pub fn purge_news_items(conn: &Connection, max_age_days: i64) -> Result<u64> {
    let removed = conn.execute(
        "DELETE FROM news WHERE datetime(published_at) < datetime('now', ?1)",
        params![format!("-{max_age_days} days")],
    )?;
    Ok(removed as u64)
}
