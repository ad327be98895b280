// ivf-news: fertility and IVF news forwarder from RSS to Telegram
//
// This is the library root. Each module corresponds to one stage of the
// forwarding pipeline or a piece of the plumbing around it.

pub mod ai;
pub mod config;
pub mod db;
pub mod dedup;
pub mod feed;
pub mod pipeline;
pub mod status;
pub mod telegram;
pub mod topics;

#[cfg(feature = "web")]
pub mod web;
