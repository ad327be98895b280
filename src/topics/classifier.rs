// Topic classifier — multilingual relevance check for feed entries.
//
// A text is relevant when any vocabulary pattern matches, or when the
// ambiguous acronym "art" appears together with a reproductive-context term.
// The stop list runs first: a text mentioning any stop term is rejected
// regardless of positive matches.
//
// Matching is case-insensitive by lower-casing the input before it reaches
// the regexes; regex-lite's own case folding is ASCII-only.

use anyhow::{Context, Result};
use regex_lite::Regex;
use tracing::debug;

use super::vocabulary::{
    Anchor, Term, ART_ACRONYM, ART_CONTEXT_TERMS, LETTER_CLASS, MEDICAL_GLOSSARY, STOP_TERMS,
    TOPIC_TERMS,
};

/// Outcome of classifying one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relevance {
    /// Matched the vocabulary; carries the matched text.
    Relevant(String),
    /// A stop term vetoed the text; carries the stop term found.
    Vetoed(String),
    Irrelevant,
}

impl Relevance {
    pub fn is_relevant(&self) -> bool {
        matches!(self, Relevance::Relevant(_))
    }
}

/// Lower-case and collapse every whitespace run into one ASCII space.
pub fn prepare(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn compile(pattern: &str, anchor: Anchor) -> Result<Regex> {
    let full = match anchor {
        Anchor::Word => format!("(?:^|[^{LETTER_CLASS}])(?:{pattern})(?:[^{LETTER_CLASS}]|$)"),
        Anchor::Prefix => format!("(?:^|[^{LETTER_CLASS}])(?:{pattern})"),
        Anchor::Anywhere => format!("(?:{pattern})"),
    };
    Regex::new(&full).with_context(|| format!("Invalid topic pattern: {pattern}"))
}

fn compile_terms(terms: &[Term]) -> Result<Vec<Regex>> {
    terms.iter().map(|t| compile(t.pattern, t.anchor)).collect()
}

/// Compile a literal keyword (user-supplied or from the glossary).
fn compile_literal(keyword: &str, anchor: Anchor) -> Result<Regex> {
    compile(&regex_lite::escape(&prepare(keyword)), anchor)
}

/// The matched text with boundary characters trimmed off.
fn matched_text(regex: &Regex, text: &str) -> Option<String> {
    regex.find(text).map(|m| {
        m.as_str()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string()
    })
}

pub struct TopicClassifier {
    patterns: Vec<Regex>,
    art: Regex,
    art_context: Vec<Regex>,
    stop_terms: Vec<Regex>,
    stop_list: bool,
}

impl TopicClassifier {
    /// Build the classifier from the built-in vocabulary plus the Russian
    /// side of the medical glossary. The stop list starts enabled.
    pub fn new() -> Result<Self> {
        let mut patterns = compile_terms(TOPIC_TERMS)?;
        for &(_, ru) in MEDICAL_GLOSSARY {
            // "ПГТ (преимплантационное ...)" contributes just "пгт".
            let head = ru.split(" (").next().unwrap_or(ru);
            patterns.push(compile_literal(head, Anchor::Word)?);
        }

        Ok(Self {
            patterns,
            art: compile(ART_ACRONYM.pattern, ART_ACRONYM.anchor)?,
            art_context: compile_terms(ART_CONTEXT_TERMS)?,
            stop_terms: compile_terms(STOP_TERMS)?,
            stop_list: true,
        })
    }

    /// Add literal keywords (matched on word boundaries, case-insensitive).
    /// Blank entries are ignored.
    pub fn with_keywords(mut self, keywords: &[String]) -> Result<Self> {
        for keyword in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            self.patterns.push(compile_literal(keyword, Anchor::Word)?);
        }
        Ok(self)
    }

    pub fn with_stop_list(mut self, enabled: bool) -> Self {
        self.stop_list = enabled;
        self
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Classify `text`, reporting which term decided the outcome.
    pub fn classify(&self, text: &str) -> Relevance {
        let text = prepare(text);
        if text.is_empty() {
            return Relevance::Irrelevant;
        }

        if self.stop_list {
            if let Some(term) = self.stop_terms.iter().find_map(|r| matched_text(r, &text)) {
                debug!(stop_term = %term, "Text vetoed by stop list");
                return Relevance::Vetoed(term);
            }
        }

        if let Some(term) = self.patterns.iter().find_map(|r| matched_text(r, &text)) {
            return Relevance::Relevant(term);
        }

        if self.art.is_match(&text) && self.art_context.iter().any(|r| r.is_match(&text)) {
            return Relevance::Relevant("art".to_string());
        }

        Relevance::Irrelevant
    }

    pub fn is_relevant(&self, text: &str) -> bool {
        self.classify(text).is_relevant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TopicClassifier {
        TopicClassifier::new().unwrap()
    }

    #[test]
    fn test_all_vocabulary_compiles() {
        let c = classifier();
        assert_eq!(c.pattern_count(), TOPIC_TERMS.len() + MEDICAL_GLOSSARY.len());
    }

    #[test]
    fn test_prepare_collapses_whitespace() {
        assert_eq!(prepare("  Egg\n\tDonation  "), "egg donation");
    }

    #[test]
    fn test_ivf_is_relevant() {
        let c = classifier();
        assert_eq!(
            c.classify("New IVF protocol improves outcomes"),
            Relevance::Relevant("ivf".to_string())
        );
    }

    #[test]
    fn test_bare_art_not_relevant() {
        let c = classifier();
        assert!(!c.is_relevant("Modern art exhibition opens in London"));
    }

    #[test]
    fn test_art_with_context_is_relevant() {
        let c = classifier();
        assert!(c.is_relevant("ART and reproductive outcomes in older patients"));
    }

    #[test]
    fn test_art_inside_word_does_not_trigger() {
        let c = classifier();
        assert!(!c.is_relevant("Heart surgery and reproductive rights debate"));
        assert!(!c.is_relevant("Start of the season"));
    }

    #[test]
    fn test_stop_list_vetoes() {
        let c = classifier();
        assert_eq!(
            c.classify("Путин обсудил ЭКО с министрами"),
            Relevance::Vetoed("путин".to_string())
        );
    }

    #[test]
    fn test_stop_list_can_be_disabled() {
        let c = classifier().with_stop_list(false);
        assert!(c.is_relevant("Путин обсудил ЭКО с министрами"));
    }

    #[test]
    fn test_cyrillic_word_boundary() {
        let c = classifier();
        assert!(c.is_relevant("В клинике ЭКО открылось новое отделение"));
        assert!(!c.is_relevant("Экология города"));
    }

    #[test]
    fn test_chinese_matches_without_spaces() {
        let c = classifier();
        assert!(c.is_relevant("试管婴儿技术取得新进展"));
    }

    #[test]
    fn test_accented_stems() {
        let c = classifier();
        assert!(c.is_relevant("La fécondation in vitro progresse"));
        assert!(c.is_relevant("Künstliche Befruchtung wird günstiger"));
        assert!(c.is_relevant("La fertilità in Italia"));
        assert!(c.is_relevant("Nuevo estudio sobre reproducción asistida"));
    }

    #[test]
    fn test_fertilizer_not_relevant() {
        let c = classifier();
        assert!(!c.is_relevant("Fertilizer prices rise for farmers"));
    }

    #[test]
    fn test_glossary_terms_are_keywords() {
        let c = classifier();
        assert!(c.is_relevant("Стимуляция яичников по новому протоколу"));
    }

    #[test]
    fn test_extra_keywords() {
        let c = classifier()
            .with_keywords(&["Mitochondrial donation".to_string(), "  ".to_string()])
            .unwrap();
        assert!(c.is_relevant("UK approves mitochondrial donation"));
        assert!(!classifier().is_relevant("UK approves mitochondrial donation"));
    }

    #[test]
    fn test_keyword_with_regex_chars_is_literal() {
        let c = classifier().with_keywords(&["c++".to_string()]).unwrap();
        assert!(c.is_relevant("written in c++ today"));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(classifier().classify("   "), Relevance::Irrelevant);
    }
}
