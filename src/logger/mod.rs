//! Structured event log: append-only JSONL with graceful degradation.

pub mod jsonl;

pub use jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity, SharedEventLog};
