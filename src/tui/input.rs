//! Key binding dispatch for the chat panel.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::ChatPanel;

/// Handle a key event, mutating panel state.
pub fn handle_key(panel: &mut ChatPanel, key: KeyEvent) {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            panel.should_quit = true;
        }
        KeyCode::Esc => panel.clear_draft(),
        KeyCode::Enter => panel.request_submit(),
        KeyCode::Backspace => panel.pop_draft_char(),
        KeyCode::Char(c) => panel.push_draft_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::chat::{ChatError, ChatResponse, ChatTransport, ConversationController};

    struct NullTransport;

    #[async_trait]
    impl ChatTransport for NullTransport {
        async fn send(&self, _prompt: &str) -> Result<ChatResponse, ChatError> {
            Ok(ChatResponse {
                reply: String::new(),
                deployment: "test".into(),
            })
        }
    }

    fn panel() -> ChatPanel {
        ChatPanel::new(Arc::new(ConversationController::new(Arc::new(NullTransport))))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn ctrl_c_quits() {
        let mut p = panel();
        handle_key(&mut p, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(p.should_quit);
    }

    #[test]
    fn plain_c_is_just_a_character() {
        let mut p = panel();
        handle_key(&mut p, press(KeyCode::Char('c')));
        assert!(!p.should_quit);
        assert_eq!(p.snapshot.draft_prompt, "c");
    }

    #[test]
    fn escape_clears_the_draft() {
        let mut p = panel();
        for c in "hello".chars() {
            handle_key(&mut p, press(KeyCode::Char(c)));
        }
        assert_eq!(p.snapshot.draft_prompt, "hello");

        handle_key(&mut p, press(KeyCode::Esc));
        assert_eq!(p.snapshot.draft_prompt, "");
    }

    #[test]
    fn backspace_pops_one_char() {
        let mut p = panel();
        for c in "hi".chars() {
            handle_key(&mut p, press(KeyCode::Char(c)));
        }
        handle_key(&mut p, press(KeyCode::Backspace));
        assert_eq!(p.snapshot.draft_prompt, "h");
    }

    #[test]
    fn enter_requests_submission() {
        let mut p = panel();
        for c in "ping".chars() {
            handle_key(&mut p, press(KeyCode::Char(c)));
        }
        handle_key(&mut p, press(KeyCode::Enter));
        assert_eq!(p.pending_submit.as_deref(), Some("ping"));
    }
}
