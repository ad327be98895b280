use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::db::models::MatchPolicy;
use crate::topics::vocabulary::DEFAULT_FEEDS;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Channel or chat the posts go to (`@channel` or a numeric id).
    pub telegram_chat_id: String,
    pub db_path: String,
    /// PostgreSQL connection URL (when set and starts with postgres://, uses Postgres backend)
    pub database_url: Option<String>,
    pub check_interval: Duration,
    pub max_news_per_cycle: usize,
    /// Soft wall-clock budget; the feed loop stops early once exceeded.
    pub cycle_budget: Duration,
    pub feed_delay: Duration,
    pub retention_days: i64,
    pub dedup_match: MatchPolicy,
    pub topic_stop_list: bool,
    pub extra_keywords: Vec<String>,
    pub rss_feeds: Vec<String>,
    pub ai_api_url: Option<String>,
    pub ai_model: String,
    pub ai_api_key: Option<String>,
    pub ai_temperature: f64,
    pub ai_max_tokens: u32,
    pub embedding_api_url: Option<String>,
    pub embedding_model: String,
    pub similarity_threshold: f64,
    pub embedding_refresh: Duration,
    pub target_language: String,
    pub port: u16,
}

/// Read a variable, treating empty values as unset.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Invalid value for {name}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, default: bool) -> Result<bool> {
    match var(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("Invalid value for {name}: {v:?} (expected true/false)"),
        },
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(name: &str) -> Vec<String> {
    var(name)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the Telegram credentials, which are
    /// only checked by `require_telegram` so `init` and `status` work
    /// without them. A numeric variable that doesn't parse is an error.
    pub fn load() -> Result<Self> {
        let retention_days = parse_var("RETENTION_DAYS", 30i64)?;
        if retention_days < 0 {
            anyhow::bail!("Invalid value for RETENTION_DAYS: {retention_days} (must be 0 or more)");
        }

        let rss_feeds = match parse_list("RSS_FEEDS") {
            feeds if feeds.is_empty() => DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            feeds => feeds,
        };

        Ok(Self {
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            telegram_chat_id: var("TELEGRAM_CHAT_ID")
                .or_else(|| var("GROUP_CHAT_ID"))
                .unwrap_or_default(),
            db_path: var("IVF_NEWS_DB_PATH").unwrap_or_else(|| "./ivf_news.db".to_string()),
            database_url: var("DATABASE_URL"),
            check_interval: Duration::from_secs(parse_var("CHECK_INTERVAL", 1800u64)?),
            max_news_per_cycle: parse_var("MAX_NEWS_PER_CYCLE", 10usize)?,
            cycle_budget: Duration::from_secs(parse_var("CYCLE_BUDGET_SECS", 1500u64)?),
            feed_delay: Duration::from_millis(parse_var("FEED_DELAY_MS", 1000u64)?),
            retention_days,
            dedup_match: parse_var("DEDUP_MATCH", MatchPolicy::Link)?,
            topic_stop_list: parse_bool("TOPIC_STOP_LIST", true)?,
            extra_keywords: parse_list("EXTRA_KEYWORDS"),
            rss_feeds,
            ai_api_url: var("AI_API_URL"),
            ai_model: var("AI_MODEL").unwrap_or_else(|| "openai/gpt-4o-mini".to_string()),
            ai_api_key: var("AI_API_KEY"),
            ai_temperature: parse_var("AI_TEMPERATURE", 0.7f64)?,
            ai_max_tokens: parse_var("AI_MAX_TOKENS", 350u32)?,
            embedding_api_url: var("EMBEDDING_API_URL"),
            embedding_model: var("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            similarity_threshold: parse_var("SIMILARITY_THRESHOLD", 0.85f64)?,
            embedding_refresh: Duration::from_secs(parse_var("EMBEDDING_REFRESH_SECS", 1800u64)?),
            target_language: var("TARGET_LANGUAGE").unwrap_or_else(|| "ru".to_string()),
            port: parse_var("PORT", 8080u16)?,
        })
    }

    /// Check that the Telegram credentials are configured.
    /// Call this before starting the forwarder.
    pub fn require_telegram(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            anyhow::bail!(
                "TELEGRAM_BOT_TOKEN not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        if self.telegram_chat_id.is_empty() {
            anyhow::bail!(
                "TELEGRAM_CHAT_ID not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// The rewrite endpoint is usable only with both a URL and a key.
    pub fn ai_endpoint(&self) -> Option<(&str, &str)> {
        match (&self.ai_api_url, &self.ai_api_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}
