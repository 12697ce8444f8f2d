//! TUI messages — single enum driving the update loop.

use crossterm::event::KeyEvent;

/// Messages that drive the chat panel.
#[derive(Debug, Clone)]
pub enum TuiMessage {
    /// Keyboard input.
    Input(KeyEvent),
    /// Tick: re-read the conversation snapshot.
    Tick,
    /// Quit the panel.
    Quit,
}
