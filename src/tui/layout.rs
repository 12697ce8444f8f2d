//! Chat panel layout — transcript pane, input bar, status line.
//!
//! ```text
//! ┌─[ Chat ]────────────────────────────────┐
//! │ you ▸ what's on my list today?          │
//! │ bot ▸ Three items, two due this evening │
//! │ Thinking...                             │
//! ├─────────────────────────────────────────┤
//! │ > input bar                             │
//! ├─────────────────────────────────────────┤
//! │ [waiting] Enter:Send Esc:Clear ^C:Quit  │
//! └─────────────────────────────────────────┘
//! ```

use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::chat::{ConversationSnapshot, Role};

use super::app::ChatPanel;

/// Draw the full panel.
pub fn draw(f: &mut Frame, panel: &ChatPanel) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // transcript
            Constraint::Length(3), // input bar
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    draw_transcript(f, panel, outer[0]);
    draw_input(f, panel, outer[1]);
    draw_status(f, panel, outer[2]);
}

fn draw_transcript(f: &mut Frame, panel: &ChatPanel, area: Rect) {
    let block = Block::default().title(" Chat ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = transcript_lines(&panel.snapshot);
    let offset = follow_offset(&lines, inner);
    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(transcript, inner);
}

/// Build the transcript view: one block of lines per turn, a hint when the
/// conversation is empty, a spinner line while a request is outstanding.
fn transcript_lines(snapshot: &ConversationSnapshot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if snapshot.transcript.is_empty() && !snapshot.in_flight {
        lines.push(Line::from(Span::styled(
            "Ask anything to start a conversation.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for turn in &snapshot.transcript {
        let (marker, style) = match turn.role {
            Role::User => ("you ▸ ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Role::Assistant => ("bot ▸ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        };
        // First line carries the speaker marker; continuation lines indent.
        for (i, text_line) in turn.text.lines().enumerate() {
            if i == 0 {
                lines.push(Line::from(vec![
                    Span::styled(marker.to_string(), style),
                    Span::raw(text_line.to_string()),
                ]));
            } else {
                lines.push(Line::from(format!("      {text_line}")));
            }
        }
        if turn.text.is_empty() {
            lines.push(Line::from(Span::styled(marker.to_string(), style)));
        }
    }

    if snapshot.in_flight {
        lines.push(Line::from(Span::styled(
            "Thinking...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Scroll offset that keeps the latest turn visible, accounting for wrap.
fn follow_offset(lines: &[Line<'_>], area: Rect) -> u16 {
    let width = area.width.max(1) as usize;
    let rendered: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    rendered.saturating_sub(area.height as usize) as u16
}

fn draw_input(f: &mut Frame, panel: &ChatPanel, area: Rect) {
    let block = Block::default()
        .title(" Prompt ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let draft = panel.snapshot.draft_prompt.as_str();
    let visible_width = inner.width.saturating_sub(1) as usize;
    // Show the tail when the draft outgrows the bar.
    let hscroll = draft.chars().count().saturating_sub(visible_width) as u16;
    f.render_widget(Paragraph::new(draft).scroll((0, hscroll)), inner);

    let cursor_x = inner.x + (draft.chars().count() as u16).min(inner.width.saturating_sub(1));
    f.set_cursor_position(Position::new(cursor_x, inner.y));
}

fn draw_status(f: &mut Frame, panel: &ChatPanel, area: Rect) {
    let mode = if panel.snapshot.in_flight {
        Span::styled("[waiting]", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("[idle]", Style::default().fg(Color::Green))
    };
    let status = Line::from(vec![
        mode,
        Span::raw(" "),
        Span::styled(
            "Enter:Send  Esc:Clear  ^C:Quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(status), area);
}
