use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

/// Shown when a send fails, whatever the reason. The failed message stays in
/// the replayed history, so only a new conversation recovers.
pub const DISALLOWED_CONTENT_ALERT: &str = "Cannot give personal opinions, hate speech, slurs or dangerous content. \
     This conversation cannot continue; type /new to start a new one.";

/// Kind of overlay, which decides its colors and title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Error,
    Info,
}

/// Modal box drawn over the conversation. While one is open the view
/// swallows every key except the ones that dismiss it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn error(body: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            title: "Message not sent".to_string(),
            body: body.into(),
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    /// The alert opened by a failed send
    pub fn disallowed_content() -> Self {
        Self::error(DISALLOWED_CONTENT_ALERT)
    }

    fn color(&self) -> Color {
        match self.kind {
            AlertKind::Error => Color::Red,
            AlertKind::Info => Color::Cyan,
        }
    }
}

impl Widget for &Alert {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let body_lines = self.body.lines().count() as u16;
        let height = (body_lines + 4).max(6);
        let popup = centered_rect(70, height, area);

        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {} ", self.title),
                Style::default().fg(self.color()).add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().fg(self.color()));

        let mut lines: Vec<Line> = self.body.lines().map(Line::from).collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Enter or Esc to dismiss",
            Style::default().fg(Color::DarkGray),
        )));

        Paragraph::new(lines)
            .block(block)
            .alignment(match self.kind {
                AlertKind::Error => Alignment::Center,
                AlertKind::Info => Alignment::Left,
            })
            .wrap(Wrap { trim: false })
            .render(popup, buf);
    }
}

/// Rect of `percent_x` width and `height` rows centered in `area`
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_send_alert_names_the_disallowed_categories() {
        let alert = Alert::disallowed_content();
        assert_eq!(alert.kind, AlertKind::Error);
        for phrase in ["personal opinions", "hate speech", "slurs", "dangerous content"] {
            assert!(alert.body.contains(phrase), "missing {phrase}");
        }
        assert!(alert.body.contains("/new"));
        assert!(!alert.body.contains("try again"));
    }

    #[test]
    fn popup_fits_inside_the_area() {
        let area = Rect::new(0, 0, 100, 10);
        let popup = centered_rect(70, 20, area);
        assert!(popup.height <= area.height);
        assert_eq!(popup.width, 70);
    }
}
