// AI text processing — rewrite, translation, glossary, and fallbacks.

pub mod client;
pub mod fallback;
pub mod glossary;
pub mod processor;

pub use client::{ChatClient, TextGenerator};
pub use fallback::OrOriginal;
pub use processor::{AiProcessor, AiState, ProcessedText};
