// Semantic near-duplicate detection.
//
// Each processed article is embedded into a dense vector by an external
// OpenAI-compatible `/embeddings` endpoint. A new candidate is compared
// against every retained embedding (brute-force cosine scan); if the best
// similarity strictly exceeds the threshold, the candidate is a duplicate.
//
// The retained set lives in an in-memory `EmbeddingCache` that reloads from
// the database on an interval and grows as new items are stored in between.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;

/// Similarity above which two articles count as the same story.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// How often the cache reloads from the database.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1800);

/// Age window (days) of embeddings kept for comparison.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Cosine similarity between two vectors.
///
/// Returns `None` when either vector has zero norm or the dimensions
/// differ, since the similarity is undefined there.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        None
    } else {
        Some(dot / denom)
    }
}

/// The closest stored item when a candidate is judged a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub id: String,
    pub similarity: f64,
}

/// Scan `known` for the most similar embedding. Reports a match only when
/// that best similarity strictly exceeds `threshold`; undefined comparisons
/// are skipped.
pub fn find_duplicate(
    embedding: &[f64],
    known: &[(String, Vec<f64>)],
    threshold: f64,
) -> Option<SemanticMatch> {
    let mut best: Option<SemanticMatch> = None;
    for (id, other) in known {
        let Some(similarity) = cosine_similarity(embedding, other) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| similarity > b.similarity) {
            best = Some(SemanticMatch {
                id: id.clone(),
                similarity,
            });
        }
    }
    best.filter(|m| m.similarity > threshold)
}

/// Trait for turning text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>>;
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let mut builder = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(30))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to call embedding API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API returned {}: {}", status, body);
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding API response")?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("Embedding API returned no data")?;

        debug!(dim = embedding.len(), "Computed embedding");
        Ok(embedding)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

/// In-memory copy of recent `(id, embedding)` pairs.
pub struct EmbeddingCache {
    entries: Vec<(String, Vec<f64>)>,
    last_refresh: Option<Instant>,
    refresh_interval: Duration,
    window_days: i64,
}

impl EmbeddingCache {
    pub fn new(refresh_interval: Duration, window_days: i64) -> Self {
        Self {
            entries: Vec::new(),
            last_refresh: None,
            refresh_interval,
            window_days,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True before the first load and once the refresh interval has elapsed.
    pub fn needs_refresh(&self) -> bool {
        match self.last_refresh {
            None => true,
            Some(at) => at.elapsed() >= self.refresh_interval,
        }
    }

    /// Reload from the database, replacing the current entries.
    pub async fn refresh(&mut self, db: &dyn Database) -> Result<usize> {
        self.entries = db.get_recent_embeddings(self.window_days).await?;
        self.last_refresh = Some(Instant::now());
        info!(count = self.entries.len(), "Embedding cache refreshed");
        Ok(self.entries.len())
    }

    pub async fn refresh_if_due(&mut self, db: &dyn Database) -> Result<()> {
        if self.needs_refresh() {
            self.refresh(db).await?;
        }
        Ok(())
    }

    /// Add a freshly stored item so it is compared before the next reload.
    pub fn push(&mut self, id: String, embedding: Vec<f64>) {
        self.entries.push((id, embedding));
    }

    pub fn find_duplicate(&self, embedding: &[f64], threshold: f64) -> Option<SemanticMatch> {
        find_duplicate(embedding, &self.entries, threshold)
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL, DEFAULT_WINDOW_DAYS)
    }
}
