// Explicit fail-open helpers for text transforms.

use anyhow::Result;
use tracing::warn;

/// Fall back to the untouched input when a transform fails.
///
/// Used at every call site where a translation or rewrite error must not
/// block delivery, so the fallback is visible in the code rather than
/// hidden in a catch-all.
pub trait OrOriginal {
    fn or_original(self, original: &str) -> String;
}

impl OrOriginal for Result<String> {
    fn or_original(self, original: &str) -> String {
        match self {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Text transform failed, using original text");
                original.to_string()
            }
        }
    }
}

/// `"ru"` if the text contains any Cyrillic character, otherwise `"en"`.
pub fn detect_language(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
        "ru"
    } else {
        "en"
    }
}

/// The first `max_chars` characters of `text` (never splits a character).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
