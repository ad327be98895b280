// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Links that were already forwarded to the channel
        CREATE TABLE IF NOT EXISTS seen_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            normalized_link TEXT NOT NULL,     -- canonical URL
            original_link TEXT NOT NULL,       -- as fetched
            title TEXT NOT NULL,
            title_hash TEXT NOT NULL,          -- sha256 of trimmed, lower-cased title
            published_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (normalized_link, title_hash)
        );

        -- Scan state — last cycle timestamp and similar bookkeeping
        CREATE TABLE IF NOT EXISTS scan_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Title-only lookups for the link_or_title policy
        CREATE INDEX IF NOT EXISTS idx_seen_title_hash
            ON seen_items(title_hash);

        -- Retention sweep
        CREATE INDEX IF NOT EXISTS idx_seen_published
            ON seen_items(published_at);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: processed articles for the AI pipeline.
    // Embeddings are stored as JSON arrays of floats.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS news (
                id TEXT PRIMARY KEY,           -- hash of the normalized URL
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                original_text TEXT NOT NULL,
                summary TEXT NOT NULL,
                image_url TEXT,
                embedding TEXT,
                summary_embedding TEXT,
                published_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_news_published ON news(published_at);
            CREATE INDEX IF NOT EXISTS idx_news_summary ON news(summary);
            ",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, seen_items, scan_state, news
        assert_eq!(table_count(&conn).unwrap(), 4);
    }

    #[test]
    fn test_seen_items_unique_key_rejects_plain_duplicate_insert() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let insert = "INSERT INTO seen_items (normalized_link, original_link, title, title_hash)
                      VALUES ('https://x.com/a', 'https://x.com/a', 'T', 'h')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_migrations_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
