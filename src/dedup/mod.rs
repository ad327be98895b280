// Deduplication — canonical URLs, title fingerprints, and the seen-items store.

pub mod hash;
pub mod normalize;
pub mod store;

pub use hash::{news_id, title_hash};
pub use normalize::normalize_url;
pub use store::DedupStore;
