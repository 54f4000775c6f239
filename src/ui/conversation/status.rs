use crate::session::SessionState;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// One-line session indicator under the transcript
pub struct StatusLine<'a> {
    pub state: SessionState,
    pub model: &'a str,
    pub notice: Option<&'a str>,
}

/// Error flag text, drawn in red above the composer
pub struct ErrorBanner<'a> {
    pub message: &'a str,
}

/// Animated dots for the busy states
fn dots() -> &'static str {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    match (millis / 300) % 4 {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    }
}

/// Symbol, label and color for each state
pub fn indicator(state: SessionState) -> (&'static str, &'static str, Color) {
    match state {
        SessionState::Uninitialized => ("○", "Not connected", Color::DarkGray),
        SessionState::Initializing => ("◌", "Connecting", Color::Yellow),
        SessionState::Ready => ("●", "Ready", Color::Green),
        SessionState::Sending => ("◌", "Bot is thinking", Color::Yellow),
        SessionState::Error => ("✖", "Session unavailable, type /retry", Color::Red),
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (symbol, label, color) = indicator(self.state);
        let busy = matches!(self.state, SessionState::Initializing | SessionState::Sending);

        let mut spans = vec![
            Span::styled(format!("{} ", symbol), Style::default().fg(color)),
            Span::styled(label, Style::default().fg(color)),
        ];
        if busy {
            spans.push(Span::styled(dots(), Style::default().fg(color)));
        }
        spans.push(Span::styled(
            format!("  {}", self.model),
            Style::default().fg(Color::DarkGray),
        ));
        if let Some(notice) = self.notice {
            spans.push(Span::styled(
                format!("  {}", notice),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

impl Widget for ErrorBanner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(vec![Span::styled(
            self.message,
            Style::default().fg(Color::Red),
        )]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_state_points_at_retry() {
        let (_, label, color) = indicator(SessionState::Error);
        assert!(label.contains("/retry"));
        assert_eq!(color, Color::Red);
    }

    #[test]
    fn status_line_renders_label_and_model() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        StatusLine {
            state: SessionState::Ready,
            model: "gemini-1.0-pro-001",
            notice: None,
        }
        .render(area, &mut buf);

        let text: String = (0..area.width)
            .map(|x| buf.get(x, 0).symbol().to_string())
            .collect();
        assert!(text.contains("Ready"));
        assert!(text.contains("gemini-1.0-pro-001"));
    }
}
