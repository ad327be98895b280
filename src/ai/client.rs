// Chat-completion client for the rewrite and translation steps.
//
// Speaks the OpenAI-compatible `/chat/completions` format, which covers
// OpenRouter and most hosted or self-hosted LLM gateways.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default sampling temperature for rewrites.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default completion length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 350;

/// Trait for a text-in, text-out language model call.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct ChatClient {
    client: Client,
    url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatClient {
    pub fn new(url: String, model: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            url,
            model,
            api_key,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_params(mut self, temperature: f64, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(60))
            .json(&request)
            .send()
            .await
            .context("Failed to call chat completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion API returned {}: {}", status, body);
        }

        let result: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .context("Chat completion returned no content")?;

        debug!(
            model = %self.model,
            chars = content.chars().count(),
            "Chat completion received"
        );
        Ok(content)
    }
}

// --- Request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}
