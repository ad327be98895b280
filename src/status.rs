// System status display — DB stats, recent news, last cycle time.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::db::Database;
use crate::pipeline::cycle::LAST_CYCLE_KEY;

/// Display system status to the terminal.
///
/// `db_display` is either the SQLite path or a redacted PostgreSQL URL.
pub async fn show(db: &Arc<dyn Database>, db_display: &str) -> Result<()> {
    if Path::new(db_display).exists() {
        let file_size = std::fs::metadata(db_display)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!("Database: {} ({})", db_display, file_size);
    } else {
        println!("Database: {}", db_display);
    }

    let seen = db.count_seen_items().await?;
    let news = db.count_news_items().await?;
    println!("Seen links: {}", seen);
    println!("Stored news: {}", news);

    let recent = db.get_recent_news(5).await?;
    if recent.is_empty() {
        println!("Recent news: none forwarded yet");
    } else {
        println!("Recent news: {} most recent:", recent.len());
        for item in &recent {
            println!("  {} {}", item.published_at.dimmed(), item.title);
        }
    }

    match db.get_scan_state(LAST_CYCLE_KEY).await? {
        Some(last) => println!("Last cycle: {}", last),
        None => {
            println!("Last cycle: {}", "never".yellow());
            println!("  Run `ivf-news run --once` to process the feeds");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
