//! sidechat — embeddable conversation core with a terminal front-end.
//!
//! Wraps a remote `/ai/chat` endpoint with turn sequencing, a single-flight
//! submission guard, and opt-in usage telemetry. The TUI is a thin renderer
//! over the conversation snapshot.

pub mod chat;
pub mod config;
pub mod telemetry;
pub mod tui;
