// Forwarding pipeline — one polling cycle and the timer loop around it.

pub mod cycle;

pub use cycle::{Aggregator, CycleReport, EntryOutcome, PipelineSettings};
