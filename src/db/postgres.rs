// PgDatabase — PostgreSQL backend implementing the Database trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// Key differences from SQLite:
// - TIMESTAMPTZ instead of TEXT for timestamps
// - pgvector for embedding storage
// - $1/$2 parameter syntax (handled by sqlx)
// - SSL is required unless the URL sets sslmode explicitly

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_core::row::Row;
use sqlx_postgres::{PgConnectOptions, PgSslMode, Postgres};

use super::models::{MatchPolicy, NewsItem, SeenItem};
use super::traits::Database;

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

pub struct PgDatabase {
    pool: PgPool,
}

/// Build connect options from a URL, forcing `sslmode=require` when the URL
/// doesn't choose a mode itself.
fn connect_options(database_url: &str) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(database_url)
        .context("Invalid PostgreSQL connection URL")?
        .application_name("ivf_news");
    if database_url.contains("sslmode=") {
        Ok(options)
    } else {
        Ok(options.ssl_mode(PgSslMode::Require))
    }
}

fn to_pgvector(embedding: &Option<Vec<f64>>) -> Option<pgvector::Vector> {
    // pgvector stores 32-bit floats
    embedding
        .as_ref()
        .map(|v| pgvector::Vector::from(v.iter().map(|&x| x as f32).collect::<Vec<f32>>()))
}

fn from_pgvector(vector: Option<pgvector::Vector>) -> Option<Vec<f64>> {
    vector.map(|v| v.to_vec().into_iter().map(|f| f as f64).collect())
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options(database_url)?)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// Holds a session-level advisory lock on a dedicated connection so two
    /// processes starting together don't apply the same migration. The
    /// unlock always runs, even if a migration fails.
    ///
    /// Migration 1 contains `CREATE EXTENSION`, which cannot run inside a
    /// transaction; its DDL is idempotent. Later migrations run in a
    /// transaction.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "IVFNEWS\0" as a big-endian i64.
        const MIGRATION_LOCK_KEY: i64 = 0x4956_464E_4557_5300_u64 as i64;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [
                (
                    1,
                    include_str!("../../migrations/postgres/0001_initial.sql"),
                ),
                (
                    2,
                    include_str!("../../migrations/postgres/0002_news_embeddings.sql"),
                ),
            ];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    if version == 1 {
                        sqlx_core::raw_sql::raw_sql(sql).execute(&self.pool).await?;
                    } else {
                        let mut tx = self.pool.begin().await?;
                        sqlx_core::raw_sql::raw_sql(sql).execute(&mut *tx).await?;
                        tx.commit().await?;
                    }
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        // Migration error takes priority over unlock error.
        migration_result?;
        unlock_result?;

        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn table_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*)::bigint FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx_core::query::query("SELECT value FROM scan_state WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()> {
        sqlx_core::query::query(
            "INSERT INTO scan_state (key, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT(key) DO UPDATE SET value = $2, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn seen_item_exists(
        &self,
        normalized_link: &str,
        title_hash: &str,
        policy: MatchPolicy,
    ) -> Result<bool> {
        let query = match policy {
            MatchPolicy::Link => sqlx_core::query::query(
                "SELECT EXISTS(SELECT 1 FROM seen_items WHERE normalized_link = $1)",
            )
            .bind(normalized_link),
            MatchPolicy::LinkAndTitle => sqlx_core::query::query(
                "SELECT EXISTS(SELECT 1 FROM seen_items
                               WHERE normalized_link = $1 AND title_hash = $2)",
            )
            .bind(normalized_link)
            .bind(title_hash),
            MatchPolicy::LinkOrTitle => sqlx_core::query::query(
                "SELECT EXISTS(SELECT 1 FROM seen_items
                               WHERE normalized_link = $1 OR title_hash = $2)",
            )
            .bind(normalized_link)
            .bind(title_hash),
        };
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.get::<bool, _>(0))
    }

    async fn insert_seen_item(
        &self,
        normalized_link: &str,
        original_link: &str,
        title: &str,
        title_hash: &str,
    ) -> Result<bool> {
        let result = sqlx_core::query::query(
            "INSERT INTO seen_items (normalized_link, original_link, title, title_hash, published_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (normalized_link, title_hash) DO NOTHING",
        )
        .bind(normalized_link)
        .bind(original_link)
        .bind(title)
        .bind(title_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_seen_item_raw(&self, item: &SeenItem) -> Result<bool> {
        let result = sqlx_core::query::query(
            "INSERT INTO seen_items (normalized_link, original_link, title, title_hash, published_at)
             VALUES ($1, $2, $3, $4, $5::timestamptz)
             ON CONFLICT (normalized_link, title_hash) DO NOTHING",
        )
        .bind(&item.normalized_link)
        .bind(&item.original_link)
        .bind(&item.title)
        .bind(&item.title_hash)
        .bind(&item.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_seen_items(&self, limit: u32) -> Result<Vec<SeenItem>> {
        let rows = sqlx_core::query::query(
            "SELECT normalized_link, original_link, title, title_hash,
                    to_char(published_at, 'YYYY-MM-DD HH24:MI:SS') as published_at
             FROM seen_items
             ORDER BY published_at DESC, id DESC
             LIMIT $1",
        )
        .bind(limit.min(i32::MAX as u32) as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| SeenItem {
                normalized_link: r.get(0),
                original_link: r.get(1),
                title: r.get(2),
                title_hash: r.get(3),
                published_at: r.get(4),
            })
            .collect())
    }

    async fn count_seen_items(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM seen_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn purge_seen_items(&self, max_age_days: i64) -> Result<u64> {
        let result = sqlx_core::query::query(
            "DELETE FROM seen_items WHERE published_at < NOW() - make_interval(days => $1)",
        )
        .bind(i32::try_from(max_age_days).context("Retention window out of range")?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn news_item_exists(&self, id: &str) -> Result<bool> {
        let row = sqlx_core::query::query("SELECT EXISTS(SELECT 1 FROM news WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<bool, _>(0))
    }

    async fn insert_news_item(&self, item: &NewsItem) -> Result<bool> {
        let result = sqlx_core::query::query(
            "INSERT INTO news (id, url, title, original_text, summary, image_url,
                               embedding, summary_embedding, published_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::timestamptz)
             ON CONFLICT DO NOTHING",
        )
        .bind(&item.id)
        .bind(&item.url)
        .bind(&item.title)
        .bind(&item.original_text)
        .bind(&item.summary)
        .bind(&item.image_url)
        .bind(to_pgvector(&item.embedding))
        .bind(to_pgvector(&item.summary_embedding))
        .bind(&item.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn summary_exists(&self, summary: &str) -> Result<bool> {
        let row = sqlx_core::query::query(
            "SELECT EXISTS(SELECT 1 FROM news WHERE md5(summary) = md5($1) AND summary = $1)",
        )
        .bind(summary)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<bool, _>(0))
    }

    async fn get_recent_embeddings(&self, max_age_days: i64) -> Result<Vec<(String, Vec<f64>)>> {
        let rows = sqlx_core::query::query(
            "SELECT id, embedding FROM news
             WHERE embedding IS NOT NULL
               AND published_at >= NOW() - make_interval(days => $1)",
        )
        .bind(i32::try_from(max_age_days).context("Retention window out of range")?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|r| {
                let id: String = r.get(0);
                from_pgvector(r.get(1)).map(|v| (id, v))
            })
            .collect())
    }

    async fn get_recent_news(&self, limit: u32) -> Result<Vec<NewsItem>> {
        let rows = sqlx_core::query::query(
            "SELECT id, url, title, original_text, summary, image_url,
                    embedding, summary_embedding,
                    to_char(published_at, 'YYYY-MM-DD HH24:MI:SS') as published_at
             FROM news
             ORDER BY published_at DESC
             LIMIT $1",
        )
        .bind(limit.min(i32::MAX as u32) as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| NewsItem {
                id: r.get(0),
                url: r.get(1),
                title: r.get(2),
                original_text: r.get(3),
                summary: r.get(4),
                image_url: r.get(5),
                embedding: from_pgvector(r.get(6)),
                summary_embedding: from_pgvector(r.get(7)),
                published_at: r.get(8),
            })
            .collect())
    }

    async fn count_news_items(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM news")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn purge_news_items(&self, max_age_days: i64) -> Result<u64> {
        let result = sqlx_core::query::query(
            "DELETE FROM news WHERE published_at < NOW() - make_interval(days => $1)",
        )
        .bind(i32::try_from(max_age_days).context("Retention window out of range")?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
