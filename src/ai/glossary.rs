// Medical glossary — English terms rendered as bold Russian equivalents.

use anyhow::{Context, Result};
use regex_lite::{Captures, Regex};

use crate::topics::vocabulary::MEDICAL_GLOSSARY;

pub struct MedicalGlossary {
    terms: Regex,
    sections: Vec<(Regex, &'static str)>,
}

impl MedicalGlossary {
    pub fn new() -> Result<Self> {
        // Longest first so "zygote intrafallopian transfer" wins over "zygote".
        let mut keys: Vec<&str> = MEDICAL_GLOSSARY.iter().map(|(en, _)| *en).collect();
        keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let alternation = keys
            .iter()
            .map(|k| regex_lite::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let terms = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .context("Invalid glossary pattern")?;

        let sections = [
            (r"(Почему\s.+?:)", "🔬"),
            (r"(Важность\s.+?:)", "⭐"),
            (r"(Как\s.+?:)", "⚙️"),
        ]
        .into_iter()
        .map(|(pattern, emoji)| Ok((Regex::new(pattern)?, emoji)))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self { terms, sections })
    }

    /// Replace every glossary term (case-insensitive, whole words) with
    /// `<b>russian</b>`.
    pub fn apply(&self, text: &str) -> String {
        self.terms
            .replace_all(text, |caps: &Captures| {
                let found = &caps[0];
                MEDICAL_GLOSSARY
                    .iter()
                    .find(|(en, _)| en.eq_ignore_ascii_case(found))
                    .map(|(_, ru)| format!("<b>{ru}</b>"))
                    .unwrap_or_else(|| found.to_string())
            })
            .into_owned()
    }

    /// Mark "Почему ...:", "Важность ...:" and "Как ...:" lead-ins with an
    /// emoji and bold.
    pub fn highlight_sections(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (regex, emoji) in &self.sections {
            out = regex
                .replace_all(&out, |caps: &Captures| format!("{emoji} <b>{}</b>", &caps[1]))
                .into_owned();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_terms_case_insensitively() {
        let g = MedicalGlossary::new().unwrap();
        assert_eq!(
            g.apply("New IVF and Embryo research"),
            "New <b>ЭКО</b> and <b>эмбрион</b> research"
        );
    }

    #[test]
    fn test_longest_term_wins() {
        let g = MedicalGlossary::new().unwrap();
        assert_eq!(
            g.apply("zygote intrafallopian transfer"),
            "<b>зиготный внутрифаллопиевый перенос</b>"
        );
        assert_eq!(g.apply("a zygote"), "a <b>зигота</b>");
    }

    #[test]
    fn test_whole_words_only() {
        let g = MedicalGlossary::new().unwrap();
        assert_eq!(g.apply("embryology spermicide"), "embryology spermicide");
    }

    #[test]
    fn test_highlight_sections() {
        let g = MedicalGlossary::new().unwrap();
        assert_eq!(
            g.highlight_sections("Почему это важно: потому что"),
            "🔬 <b>Почему это важно:</b> потому что"
        );
    }
}
