// URL canonicalization for the seen-items key.
//
// Two links that point at the same article through different tracking
// decorations, host casing, or parameter order collapse to one string.
// Parsing failures return the input unchanged.

use url::form_urlencoded;
use url::Url;

/// Tracking parameters dropped from the query string (compared lower-cased).
/// Any other `utm_*` key is dropped as well.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "utm_name",
    "utm_reader",
    "utm_referrer",
    "utm_social",
    "utm_social-type",
    "gclid",
    "gclsrc",
    "dclid",
    "fbclid",
    "msclkid",
    "yclid",
    "twclid",
    "ttclid",
    "li_fat_id",
    "igshid",
    "mc_cid",
    "mc_eid",
    "_ga",
    "_gl",
    "_hsenc",
    "_hsmi",
    "hsctatracking",
    "mkt_tok",
    "oly_anon_id",
    "oly_enc_id",
    "vero_id",
    "wickedid",
    "rb_clickid",
    "s_cid",
    "ref_src",
    "spm",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Collapse runs of `/` in a path into a single slash.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

/// Canonical form of `url` used as the dedup identity.
///
/// - host lower-cased, leading `www.` removed
/// - fragment and userinfo dropped
/// - tracking parameters removed, the rest sorted by key
/// - repeated slashes in the path collapsed
///
/// Never fails: anything that can't be parsed as an absolute URL with a
/// host is returned as given.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };
    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => return url.to_string(),
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut out = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(&collapse_slashes(parsed.path()));

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        out.push('?');
        out.push_str(&query);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tracking_params() {
        assert_eq!(
            normalize_url("https://x.com/a?utm_source=x&id=5"),
            normalize_url("https://x.com/a?id=5")
        );
        assert_eq!(
            normalize_url("https://x.com/a?fbclid=abc&GCLID=1"),
            "https://x.com/a"
        );
    }

    #[test]
    fn test_unknown_utm_key_is_stripped() {
        assert_eq!(
            normalize_url("https://x.com/a?utm_whatever=1&p=2"),
            "https://x.com/a?p=2"
        );
    }

    #[test]
    fn test_query_order_independent() {
        assert_eq!(
            normalize_url("https://x.com/a?id=5&b=1"),
            normalize_url("https://x.com/a?b=1&id=5")
        );
        assert_eq!(normalize_url("https://x.com/a?id=5&b=1"), "https://x.com/a?b=1&id=5");
    }

    #[test]
    fn test_host_case_and_www() {
        assert_eq!(
            normalize_url("https://WWW.X.com/a"),
            normalize_url("https://x.com/a")
        );
        assert_eq!(normalize_url("https://WWW.X.com/a"), "https://x.com/a");
    }

    #[test]
    fn test_fragment_dropped() {
        assert_eq!(normalize_url("https://x.com/a#section-2"), "https://x.com/a");
    }

    #[test]
    fn test_no_trailing_question_mark() {
        assert_eq!(normalize_url("https://x.com/a?"), "https://x.com/a");
        assert_eq!(normalize_url("https://x.com/a?utm_medium=rss"), "https://x.com/a");
    }

    #[test]
    fn test_collapses_slashes() {
        assert_eq!(normalize_url("https://x.com//news///ivf"), "https://x.com/news/ivf");
    }

    #[test]
    fn test_keeps_non_default_port_drops_default() {
        assert_eq!(normalize_url("https://x.com:8443/a"), "https://x.com:8443/a");
        assert_eq!(normalize_url("https://x.com:443/a"), "https://x.com/a");
    }

    #[test]
    fn test_drops_userinfo() {
        assert_eq!(normalize_url("https://user:pw@x.com/a"), "https://x.com/a");
    }

    #[test]
    fn test_unparseable_returned_unchanged() {
        assert_eq!(normalize_url("not a url"), "not a url");
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("mailto:someone@x.com"), "mailto:someone@x.com");
    }

    #[test]
    fn test_idempotent() {
        let urls = [
            "https://WWW.Example.com//a//b?z=1&utm_source=rss&a=hello%20world#top",
            "http://x.com/path?q=a+b&q=c",
            "https://x.com:8080/a?b=%2F",
            "https://x.com",
            "not a url",
        ];
        for u in urls {
            let once = normalize_url(u);
            assert_eq!(normalize_url(&once), once, "not idempotent for {u}");
        }
    }
}
