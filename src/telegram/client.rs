// Telegram Bot API sender.
//
// Outbound sends are capped by a semaphore (5 in flight). Each message gets
// up to 3 attempts:
// - 429 responses wait for the server's `retry_after` when given, otherwise
//   exponential backoff
// - network errors and 5xx responses back off exponentially
// - any other 4xx is permanent and returned at once
//
// A message that still fails is returned as an error for the caller to log
// and drop; it never aborts the cycle.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Maximum simultaneous sendMessage calls.
pub const MAX_IN_FLIGHT: usize = 5;

/// Attempts per message, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (doubles each retry).
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum backoff delay to cap exponential growth.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Destination for formatted messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Why one delivery attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// 429; carries the server's requested wait when present.
    RateLimited(Option<Duration>),
    /// Network failure or 5xx; worth retrying.
    Transient(String),
    /// Rejected request (bad chat id, malformed HTML, ...); not retried.
    Permanent(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::RateLimited(Some(d)) => write!(f, "rate limited, retry after {d:?}"),
            DeliveryError::RateLimited(None) => write!(f, "rate limited"),
            DeliveryError::Transient(msg) => write!(f, "transient error: {msg}"),
            DeliveryError::Permanent(msg) => write!(f, "permanent error: {msg}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// `base * 2^attempt`, capped at `MAX_BACKOFF`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16)).min(MAX_BACKOFF)
}

/// Map a Bot API reply to a delivery error.
pub fn classify_response(status: StatusCode, retry_after: Option<u64>, description: &str) -> DeliveryError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        DeliveryError::RateLimited(retry_after.map(Duration::from_secs))
    } else if status.is_server_error() {
        DeliveryError::Transient(format!("{status}: {description}"))
    } else {
        DeliveryError::Permanent(format!("{status}: {description}"))
    }
}

/// Run `attempt_fn` up to `MAX_ATTEMPTS` times, waiting between attempts
/// as the error kind dictates.
pub async fn deliver_with_retry<F, Fut>(base: Duration, mut attempt_fn: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(), DeliveryError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match attempt_fn().await {
            Ok(()) => return Ok(()),
            Err(e @ DeliveryError::Permanent(_)) => return Err(e.into()),
            Err(e) => e,
        };

        attempt += 1;
        if attempt >= MAX_ATTEMPTS {
            return Err(anyhow::Error::new(err)
                .context(format!("Telegram send failed after {MAX_ATTEMPTS} attempts")));
        }

        let wait = match &err {
            DeliveryError::RateLimited(Some(d)) => *d,
            _ => backoff_delay(base, attempt - 1),
        };
        warn!(
            attempt,
            max = MAX_ATTEMPTS,
            wait_secs = wait.as_secs_f64(),
            error = %err,
            "Telegram send failed, retrying"
        );
        tokio::time::sleep(wait).await;
    }
}

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    semaphore: Semaphore,
    backoff_base: Duration,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            chat_id,
            semaphore: Semaphore::new(MAX_IN_FLIGHT),
            backoff_base: BASE_BACKOFF,
        }
    }

    /// Point at a different Bot API server (self-hosted or a test double).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// One sendMessage call.
    async fn send_once(&self, text: &str) -> std::result::Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(30))
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reply: ApiReply = response.json().await.unwrap_or_default();
        Err(classify_response(
            status,
            reply.parameters.and_then(|p| p.retry_after),
            reply.description.as_deref().unwrap_or(""),
        ))
    }
}

#[async_trait]
impl MessageSink for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let _permit = self.semaphore.acquire().await?;
        deliver_with_retry(self.backoff_base, || self.send_once(text)).await?;
        debug!(chars = text.chars().count(), "Telegram message sent");
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize, Default)]
struct ApiReply {
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}
