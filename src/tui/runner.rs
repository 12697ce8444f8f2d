//! TUI runner — main loop that wires everything together.
//!
//! Creates the terminal, multiplexes tick/render/key events, dispatches
//! pending submissions onto the runtime, and reports the telemetry side
//! channel (`chat.submitted`, `chat.completed`).

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use serde_json::Value;
use tokio::time::interval;

use crate::chat::ConversationController;
use crate::telemetry;

use super::app::ChatPanel;
use super::event::TuiMessage;
use super::layout;

/// Run the chat panel main loop. Blocks until quit.
pub async fn run_tui(controller: Arc<ConversationController>) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut panel = ChatPanel::new(controller);

    let mut tick_interval = interval(Duration::from_millis(100)); // 10Hz snapshot refresh
    let mut render_interval = interval(Duration::from_millis(33)); // ~30fps

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let was_busy = panel.snapshot.in_flight;
                panel.update(TuiMessage::Tick);
                if was_busy && !panel.snapshot.in_flight {
                    telemetry::report_event("chat.completed", HashMap::from([(
                        "transcript_turns".to_string(),
                        Value::from(panel.snapshot.transcript.len()),
                    )]));
                }
            }
            _ = render_interval.tick() => {
                terminal.draw(|f| layout::draw(f, &panel))?;
            }
            // Poll crossterm events (non-blocking via tokio::task::spawn_blocking)
            result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            }) => {
                if let Ok(Some(Event::Key(key))) = result {
                    panel.update(TuiMessage::Input(key));
                }
            }
        }

        // Submissions run on the runtime so the panel never blocks; the
        // controller's single-flight guard makes double-dispatch harmless.
        if let Some(prompt) = panel.pending_submit.take() {
            telemetry::report_event("chat.submitted", HashMap::from([(
                "prompt_chars".to_string(),
                Value::from(prompt.trim().chars().count()),
            )]));
            let controller = Arc::clone(&panel.controller);
            tokio::spawn(async move {
                controller.submit(&prompt).await;
            });
        }

        if panel.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
