// Message formatting for Telegram's HTML parse mode.

use regex_lite::Regex;

use crate::ai::fallback::truncate_chars;
use crate::ai::processor::MAX_TEXT_LENGTH;

/// Escape text for Telegram HTML (`&`, `<`, `>`, `"`).
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove Markdown residue the model sometimes emits despite instructions:
/// heading hashes, bold/italic runs, and trailing asterisks.
pub fn strip_markdown(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let line = line.trim_start_matches('#').trim_start();
        let line = line.trim_end().trim_end_matches('*').trim_end();
        lines.push(line.to_string());
    }
    let joined = lines.join("\n");
    // Runs of two or more markup characters ("**", "__", "##").
    match Regex::new(r"[#*_]{2,}") {
        Ok(runs) => runs.replace_all(&joined, "").into_owned(),
        Err(_) => joined,
    }
}

const INLINE_TAGS: &[&str] = &["b", "i", "u", "s", "code"];

/// Drop a dangling partial tag at the end and close any inline tags left
/// open by truncation.
fn balance_tags(text: &str) -> String {
    let mut out = text.to_string();
    if let Some(lt) = out.rfind('<') {
        if !out[lt..].contains('>') {
            out.truncate(lt);
        }
    }

    let mut open: Vec<&str> = Vec::new();
    let mut rest = out.as_str();
    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        let tag = &rest[start + 1..start + len];
        if let Some(name) = tag.strip_prefix('/') {
            if let Some(pos) = open.iter().rposition(|t| *t == name) {
                open.remove(pos);
            }
        } else if let Some(name) = INLINE_TAGS.iter().find(|t| **t == tag) {
            open.push(*name);
        }
        rest = &rest[start + len + 1..];
    }

    let closers: String = open.iter().rev().map(|t| format!("</{t}>")).collect();
    out + &closers
}

/// Cut `text` to at most `max_chars`, preferring the last sentence end,
/// then the last space, and append `...`.
fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head = truncate_chars(text, max_chars.saturating_sub(3));
    let cut = head
        .rfind(". ")
        .map(|i| i + 1)
        .or_else(|| head.rfind(' '))
        .filter(|&i| i > 0)
        .unwrap_or(head.len());
    balance_tags(head[..cut].trim_end()) + "..."
}

/// Assemble the channel post: cleaned body plus a clickable source link,
/// never longer than Telegram's message limit.
pub fn build_message(summary: &str, url: &str) -> String {
    let body = strip_markdown(summary)
        .replace("{link_placeholder}", "")
        .replace("Исследование опубликовано", "📚 Исследование опубликовано");
    let body = body.trim();

    let suffix = format!("\n\n📖 <a href=\"{}\">Источник</a>", escape_html(url));
    let available = MAX_TEXT_LENGTH.saturating_sub(suffix.chars().count() + 4);
    format!("{}{}", truncate_at_boundary(body, available), suffix)
}
