//! Chat core — conversation sequencing over a pluggable transport.
//!
//! `ConversationController` owns the transcript and the single-flight rule;
//! `ChatClient` does the HTTP. Renderers only ever call `set_draft`/`submit`
//! and re-read the snapshot.

pub mod conversation;
pub mod transport;

pub use conversation::{ConversationController, ConversationSnapshot, Role, Turn};
pub use transport::{ChatClient, ChatError, ChatResponse, ChatTransport, FALLBACK_ERROR_MESSAGE};
