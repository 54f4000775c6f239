//! Transcript display component

use crate::transcript::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Scroll position and formatting for the transcript pane
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    /// Lines scrolled up from the bottom; 0 follows new messages
    scroll_from_bottom: usize,
    timestamp_format: String,
}

impl ConversationHistory {
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            scroll_from_bottom: 0,
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_from_bottom
    }

    /// Borrow a widget drawing `messages` with this history's settings
    pub fn widget<'a>(&'a self, messages: &'a [Message]) -> HistoryWidget<'a> {
        HistoryWidget {
            history: self,
            messages,
        }
    }

    /// Lines for one message: a header with avatar, author and time, then
    /// the wrapped text. User turns are right-aligned.
    pub fn message_lines(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let width = width as usize;
        let timestamp = message.timestamp().format(&self.timestamp_format).to_string();
        let header_style = Style::default().fg(Color::DarkGray);
        let name_style = Style::default().add_modifier(Modifier::BOLD);

        let header = match message.role() {
            Role::User => Line::from(vec![
                Span::styled(format!("{} - {} ", Role::User.display_name(), timestamp), header_style),
                Span::styled(avatar(Role::User), name_style),
            ]),
            Role::Bot => Line::from(vec![
                Span::styled(avatar(Role::Bot), name_style),
                Span::styled(format!(" {} - {}", Role::Bot.display_name(), timestamp), header_style),
            ]),
        };

        let mut lines = vec![header];
        let text_width = width.saturating_sub(2);
        for chunk in wrap_text(message.text(), text_width) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(chunk, content_style(message.role())),
            ]));
        }

        if message.role() == Role::User {
            lines = lines.into_iter().map(|line| align_right(line, width)).collect();
        }
        lines
    }
}

/// Avatar shown next to each message
pub fn avatar(role: Role) -> &'static str {
    match role {
        Role::User => "👤",
        Role::Bot => "🤖",
    }
}

fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Green),
        Role::Bot => Style::default().fg(Color::Cyan),
    }
}

fn align_right(line: Line<'static>, width: usize) -> Line<'static> {
    let pad = width.saturating_sub(line.width());
    if pad == 0 {
        return line;
    }
    let mut spans = vec![Span::raw(" ".repeat(pad))];
    spans.extend(line.spans);
    Line::from(spans)
}

/// Wrap text to fit within `width` display columns, keeping explicit line
/// breaks and splitting words that are wider than a line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();

            while word.width() > width {
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                let rest = split_at_width(&mut word, width);
                lines.push(word);
                word = rest;
            }

            let word_width = word.width();
            let separator = usize::from(current_width > 0);
            if current_width + separator + word_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            } else if separator == 1 {
                current.push(' ');
                current_width += 1;
            }
            current_width += word_width;
            current.push_str(&word);
        }

        lines.push(current);
    }

    lines
}

/// Cut `word` after at most `width` columns and return the remainder. At
/// least one character is kept so a glyph wider than the line still moves on.
fn split_at_width(word: &mut String, width: usize) -> String {
    let mut used = 0;
    let mut cut = word.len();
    for (index, c) in word.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width && index > 0 {
            cut = index;
            break;
        }
        used += w;
    }
    word.split_off(cut)
}

/// Transcript pane, bound to the messages it draws
pub struct HistoryWidget<'a> {
    history: &'a ConversationHistory,
    messages: &'a [Message],
}

impl Widget for HistoryWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() {
            let welcome_lines = [
                Line::from(vec![Span::styled(
                    "AI ChatBot powered by Google Gemini",
                    Style::default().fg(Color::Green),
                )]),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "Type a message below and press Enter to send.",
                    Style::default().fg(Color::Gray),
                )]),
                Line::from(vec![Span::styled(
                    "Type /help for commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        for message in self.messages {
            all_lines.extend(self.history.message_lines(message, inner_area.width));
            all_lines.push(Line::from(""));
        }
        all_lines.pop();

        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        let offset = self.history.scroll_from_bottom.min(max_offset);
        let end = total - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
