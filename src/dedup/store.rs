// DedupStore — novelty check, save, and retention sweep over the Database.
//
// The novelty check is fail-open: a storage error is logged and the item is
// treated as new, so content is never silently dropped. The cost is a
// possible re-delivery when the store is flaky.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::hash::title_hash;
use super::normalize::normalize_url;
use crate::db::models::MatchPolicy;
use crate::db::Database;

/// Default age (days) after which seen items are swept.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

pub struct DedupStore {
    db: Arc<dyn Database>,
    policy: MatchPolicy,
}

impl DedupStore {
    pub fn new(db: Arc<dyn Database>, policy: MatchPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// True when no stored row matches `(link, title)` under the configured
    /// policy. Storage errors count as "new".
    pub async fn is_new(&self, link: &str, title: &str) -> bool {
        let normalized = normalize_url(link);
        let hash = title_hash(title);
        match self.db.seen_item_exists(&normalized, &hash, self.policy).await {
            Ok(exists) => !exists,
            Err(e) => {
                warn!(link = %link, error = %e, "Novelty check failed, treating item as new");
                true
            }
        }
    }

    /// Record `(link, title)` as seen. A duplicate key is a no-op and returns
    /// `Ok(false)`.
    pub async fn save(&self, link: &str, title: &str) -> Result<bool> {
        let normalized = normalize_url(link);
        let hash = title_hash(title);
        let inserted = self
            .db
            .insert_seen_item(&normalized, link, title, &hash)
            .await?;
        if !inserted {
            debug!(link = %normalized, "Seen item already recorded");
        }
        Ok(inserted)
    }

    /// Delete seen items and processed news older than `max_age_days`.
    /// Returns the number of seen items removed.
    pub async fn sweep(&self, max_age_days: i64) -> Result<u64> {
        if max_age_days < 0 {
            anyhow::bail!("Retention window must be 0 or more days, got {max_age_days}");
        }
        let seen = self.db.purge_seen_items(max_age_days).await?;
        let news = self.db.purge_news_items(max_age_days).await?;
        debug!(seen, news, max_age_days, "Retention sweep");
        Ok(seen)
    }

    pub async fn seen_count(&self) -> Result<i64> {
        self.db.count_seen_items().await
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::sqlite::SqliteDatabase;

    fn new_store(policy: MatchPolicy) -> DedupStore {
        let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        DedupStore::new(db, policy)
    }

    #[tokio::test]
    async fn test_save_then_not_new() {
        let store = new_store(MatchPolicy::Link);
        assert!(store.is_new("https://x.com/a", "IVF news").await);
        assert!(store.save("https://x.com/a", "IVF news").await.unwrap());
        assert!(!store.is_new("https://x.com/a", "IVF news").await);
        assert!(store.is_new("https://x.com/b", "Other").await);
    }

    #[tokio::test]
    async fn test_tracking_variant_is_not_new() {
        let store = new_store(MatchPolicy::Link);
        store.save("https://www.x.com/a?utm_source=rss", "T").await.unwrap();
        assert!(!store.is_new("https://x.com/a", "T").await);
    }

    #[tokio::test]
    async fn test_resave_keeps_one_row() {
        let store = new_store(MatchPolicy::Link);
        assert!(store.save("https://x.com/a", "T").await.unwrap());
        assert!(!store.save("https://x.com/a", " t ").await.unwrap());
        assert_eq!(store.seen_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_title_only_match_depends_on_policy() {
        let or_store = new_store(MatchPolicy::LinkOrTitle);
        or_store.save("https://x.com/a", "Same headline").await.unwrap();
        assert!(!or_store.is_new("https://y.com/b", "same headline").await);

        let link_store = new_store(MatchPolicy::Link);
        link_store.save("https://x.com/a", "Same headline").await.unwrap();
        assert!(link_store.is_new("https://y.com/b", "same headline").await);
    }

    #[tokio::test]
    async fn test_link_and_title_requires_both() {
        let store = new_store(MatchPolicy::LinkAndTitle);
        store.save("https://x.com/a", "Old title").await.unwrap();
        assert!(store.is_new("https://x.com/a", "Reworded title").await);
        assert!(!store.is_new("https://x.com/a", "old title").await);
    }

    #[tokio::test]
    async fn test_negative_sweep_window_rejected() {
        let store = new_store(MatchPolicy::Link);
        store.save("https://x.com/a", "T").await.unwrap();
        assert!(store.sweep(-5).await.is_err());
        assert_eq!(store.seen_count().await.unwrap(), 1);
        assert_eq!(store.policy(), MatchPolicy::Link);
    }
}
