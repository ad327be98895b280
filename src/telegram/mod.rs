// Telegram delivery — message formatting and the Bot API sender.

pub mod client;
pub mod message;

pub use client::{MessageSink, TelegramNotifier};
pub use message::build_message;
