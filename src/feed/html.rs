// HTML text extraction for article pages and feed descriptions.

use scraper::{Html, Selector};

use crate::ai::fallback::truncate_chars;
use crate::ai::processor::MAX_TEXT_LENGTH;

/// Contents of all `<p>` elements, entities decoded, one paragraph per
/// line, truncated to the message limit.
pub fn extract_paragraphs(html: &str) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    let doc = Html::parse_document(html);
    let text = doc
        .select(&selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(&text, MAX_TEXT_LENGTH).trim().to_string()
}

/// Visible text of an HTML fragment such as a feed description.
pub fn fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_paragraphs() {
        let html = r#"<html><body><pre>code</pre>
            <p class="lead">First <b>bold</b> &amp; more.</p>
            <div>skip</div>
            <P>Second
            line</P><p></p></body></html>"#;
        assert_eq!(
            extract_paragraphs(html),
            "First bold & more.\nSecond\n            line"
        );
    }

    #[test]
    fn test_entities_decoded_and_unclosed_p_split() {
        let html = "<p>IVF &mdash; it&#8217;s new<p>Second para</p>";
        assert_eq!(extract_paragraphs(html), "IVF \u{2014} it\u{2019}s new\nSecond para");
    }

    #[test]
    fn test_extract_truncates() {
        let html = format!("<p>{}</p>", "x".repeat(5000));
        assert_eq!(extract_paragraphs(&html).chars().count(), MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_no_paragraphs() {
        assert_eq!(extract_paragraphs("<div>nothing</div>"), "");
    }

    #[test]
    fn test_fragment_text() {
        assert_eq!(
            fragment_text("<a href=\"x\">ICSI</a> &amp; embryo\n <i>transfer</i>"),
            "ICSI & embryo transfer"
        );
        assert_eq!(fragment_text("plain text"), "plain text");
    }
}
