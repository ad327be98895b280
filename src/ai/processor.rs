// AiProcessor — turns the combined article text into the channel post body.
//
// The processor is constructed explicitly and injected into the pipeline.
// Its readiness is a plain state value checked before every call:
//
//   Uninitialized → initialize() → Ready        (a generator is configured)
//                                → Unavailable  (no generator)
//
// Anything but Ready takes the fallback path: the raw text truncated to the
// message limit. A Ready processor whose rewrite fails three times falls
// back to the first 200 characters instead, translated into the channel
// language when needed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use super::client::TextGenerator;
use super::fallback::{detect_language, truncate_chars, OrOriginal};
use super::glossary::MedicalGlossary;
use crate::telegram::message::escape_html;

/// Maximum Telegram message length (characters).
pub const MAX_TEXT_LENGTH: usize = 4096;

/// Length of the fallback excerpt when a rewrite fails.
pub const FAILED_REWRITE_EXCERPT: usize = 200;

/// Characters of source text included in the rewrite prompt.
const PROMPT_SOURCE_CHARS: usize = 3000;

const MAX_ATTEMPTS: u32 = 3;

const REWRITE_PROMPT: &str = "Ты редактор медицинских новостей Telegram-канала о репродуктивной медицине. \
Перепиши текст ниже для канала на русском языке.\n\n\
Форматирование:\n\
1. Один короткий заголовок на русском в начале, выделенный <b>жирным</b>.\n\
2. Короткие абзацы по 2-4 предложения, разделённые пустой строкой.\n\
3. Разметка только HTML: <b>жирный</b> для ключевых терминов, <i>курсив</i> для акцентов. Без Markdown.\n\
4. Уместные эмодзи в начале абзацев.\n\
5. Не упоминай источник и не вставляй ссылки.\n\n\
Содержание:\n\
1. Первый абзац: суть открытия и его значение для репродуктологии.\n\
2. Затем механизм и научная новизна, затем практические перспективы.\n\
3. Укажи авторов, журнал и дату, если они есть в тексте, и значимость для ЭКО.\n\
4. Соблюдай точность терминов: эмбрион (до 8 недель), плод (после), ПГТ, ИКСИ, криоконсервация.\n\n\
Исходный текст: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Uninitialized,
    Ready,
    Unavailable,
}

/// Result of processing one article's text.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedText {
    /// HTML-ready body for the message.
    pub text: String,
    /// Whether the model produced the text (false on any fallback path).
    pub rewritten: bool,
}

pub struct AiProcessor {
    generator: Option<Arc<dyn TextGenerator>>,
    glossary: MedicalGlossary,
    state: AiState,
    target_language: String,
    retry_base: Duration,
}

impl AiProcessor {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, target_language: &str) -> Result<Self> {
        Ok(Self {
            generator,
            glossary: MedicalGlossary::new()?,
            state: AiState::Uninitialized,
            target_language: target_language.to_string(),
            retry_base: Duration::from_secs(1),
        })
    }

    /// Base delay between rewrite attempts (doubles per attempt).
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn initialize(&mut self) -> AiState {
        self.state = if self.generator.is_some() {
            AiState::Ready
        } else {
            AiState::Unavailable
        };
        info!(state = ?self.state, "AI processor initialized");
        self.state
    }

    pub fn state(&self) -> AiState {
        self.state
    }

    fn ready_generator(&self) -> Option<&Arc<dyn TextGenerator>> {
        match self.state {
            AiState::Ready => self.generator.as_ref(),
            AiState::Uninitialized | AiState::Unavailable => None,
        }
    }

    /// Rewrite `text` through the model, retrying with exponential backoff.
    pub async fn rewrite(&self, text: &str) -> Result<String> {
        let Some(generator) = self.ready_generator() else {
            anyhow::bail!("AI processor is not ready ({:?})", self.state);
        };

        let prompt = format!(
            "{REWRITE_PROMPT}{}",
            truncate_chars(&self.glossary.apply(text), PROMPT_SOURCE_CHARS)
        );

        let mut attempt = 0;
        loop {
            match generator.complete(&prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt + 1 < MAX_ATTEMPTS => {
                    let delay = self.retry_base * 2u32.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max = MAX_ATTEMPTS,
                        error = %e,
                        "AI rewrite failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("AI rewrite failed after {MAX_ATTEMPTS} attempts")))
                }
            }
        }
    }

    /// Translate `text` into `target_language` through the model.
    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let Some(generator) = self.ready_generator() else {
            anyhow::bail!("AI processor is not ready ({:?})", self.state);
        };
        let prompt = format!(
            "Translate the following text into the language with ISO code \"{target_language}\". \
             Reply with the translation only.\n\n{}",
            truncate_chars(text, MAX_TEXT_LENGTH)
        );
        generator.complete(&prompt).await
    }

    /// Produce the message body for `text`. Never fails.
    pub async fn process_content(&self, text: &str) -> ProcessedText {
        if self.state != AiState::Ready {
            return ProcessedText {
                text: self.render_plain(truncate_chars(text, MAX_TEXT_LENGTH)),
                rewritten: false,
            };
        }

        match self.rewrite(text).await {
            Ok(rewritten) => ProcessedText {
                text: rewritten,
                rewritten: true,
            },
            Err(e) => {
                warn!(error = %e, "Using excerpt instead of rewrite");
                let excerpt = truncate_chars(text, FAILED_REWRITE_EXCERPT);
                let excerpt = if detect_language(excerpt) != self.target_language {
                    self.translate(excerpt, &self.target_language)
                        .await
                        .or_original(excerpt)
                } else {
                    excerpt.to_string()
                };
                ProcessedText {
                    text: self.render_plain(&excerpt),
                    rewritten: false,
                }
            }
        }
    }

    /// Escape raw text for HTML, then add glossary bolding and section marks.
    fn render_plain(&self, text: &str) -> String {
        let escaped = escape_html(text);
        self.glossary
            .highlight_sections(&self.glossary.apply(&escaped))
    }
}
