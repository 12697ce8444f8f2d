//! ChatPanel — the TEA model.
//!
//! All state lives here. `update` receives TuiMessages and mutates state;
//! the view reads state to produce ratatui widgets. No side effects in view.
//! The conversation itself lives in the controller — the panel only mirrors
//! its snapshot.

use std::sync::Arc;

use crate::chat::{ConversationController, ConversationSnapshot};

use super::event::TuiMessage;
use super::input;

/// The chat panel model.
pub struct ChatPanel {
    pub controller: Arc<ConversationController>,
    /// Last snapshot read from the controller. Refreshed on every tick and
    /// after every draft edit, so the view never blocks on the conversation.
    pub snapshot: ConversationSnapshot,
    pub should_quit: bool,
    /// Prompt pending async submission (set by the input handler on Enter,
    /// consumed by the runner).
    pub pending_submit: Option<String>,
}

impl ChatPanel {
    pub fn new(controller: Arc<ConversationController>) -> Self {
        let snapshot = controller.snapshot();
        Self {
            controller,
            snapshot,
            should_quit: false,
            pending_submit: None,
        }
    }

    /// Apply one message to the model.
    pub fn update(&mut self, message: TuiMessage) {
        match message {
            TuiMessage::Tick => self.refresh(),
            TuiMessage::Input(key) => input::handle_key(self, key),
            TuiMessage::Quit => self.should_quit = true,
        }
    }

    /// Re-read the conversation snapshot.
    pub fn refresh(&mut self) {
        self.snapshot = self.controller.snapshot();
    }

    pub fn push_draft_char(&mut self, c: char) {
        let mut draft = self.snapshot.draft_prompt.clone();
        draft.push(c);
        self.controller.set_draft(draft);
        self.refresh();
    }

    pub fn pop_draft_char(&mut self) {
        let mut draft = self.snapshot.draft_prompt.clone();
        draft.pop();
        self.controller.set_draft(draft);
        self.refresh();
    }

    pub fn clear_draft(&mut self) {
        self.controller.set_draft(String::new());
        self.refresh();
    }

    /// Ask the runner to submit the current draft.
    ///
    /// Mirrors the Send button's disabled state: blank drafts and busy
    /// conversations are ignored here for responsiveness, and the controller
    /// re-checks both anyway — this is a convenience, not the gate.
    pub fn request_submit(&mut self) {
        if self.snapshot.draft_prompt.trim().is_empty() || self.snapshot.in_flight {
            return;
        }
        self.pending_submit = Some(self.snapshot.draft_prompt.clone());
    }
}
