// Stable fingerprints for titles and news ids.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the trimmed, lower-cased title (64 chars).
pub fn title_hash(title: &str) -> String {
    let canonical = title.trim().to_lowercase();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Primary key for a processed news item: the first 32 hex chars of the
/// SHA-256 of its normalized URL.
pub fn news_id(normalized_url: &str) -> String {
    let mut id = hex::encode(Sha256::digest(normalized_url.as_bytes()));
    id.truncate(32);
    id
}
