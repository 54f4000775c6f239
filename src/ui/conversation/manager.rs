use crate::config::Config;
use crate::error::SessionError;
use crate::events::{AppEvent, Effect, TuiEvent};
use crate::llm::ChatSession;
use crate::session::{Completion, SessionSlot, SessionState};
use crate::transcript::{Message, Transcript};
use crate::ui::conversation::{
    Alert, ComposerResult, ConversationComposer, ConversationHistory, ErrorBanner, ParsedCommand,
    SlashCommand, StatusLine, get_help_text,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tracing::{debug, info, warn};

/// Error flag after a failed send
pub const SEND_FAILED: &str = "Failed to send message. Type /new to start a new conversation.";
/// Error flag after a failed session creation
pub const SESSION_FAILED: &str = "Could not start a chat session with the model. Type /retry to try again.";

/// Which failure the error flag reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorFlag {
    Session,
    Send,
}

impl ErrorFlag {
    fn message(self) -> &'static str {
        match self {
            ErrorFlag::Session => SESSION_FAILED,
            ErrorFlag::Send => SEND_FAILED,
        }
    }
}

const PLACEHOLDER: &str = "Type your message...";
const SCROLL_STEP: usize = 5;

/// The chat screen: transcript, draft, error flag and the model session.
///
/// Every input returns the effects the runtime has to carry out; results come
/// back through [`ChatView::apply`]. Nothing in here awaits.
pub struct ChatView {
    transcript: Transcript,
    composer: ConversationComposer,
    history: ConversationHistory,
    session: SessionSlot,
    error: Option<ErrorFlag>,
    alert: Option<Alert>,
    notice: Option<String>,
    model: String,
    replay_warn_threshold: usize,
    replay_warned: bool,
    /// Transcript generation at the last `/new`; replies sent before it are dropped
    conversation_start: u64,
}

impl ChatView {
    pub fn new(config: &Config) -> Self {
        Self {
            transcript: Transcript::new(),
            composer: ConversationComposer::new(PLACEHOLDER),
            history: ConversationHistory::new(config.ui.timestamp_format.clone()),
            session: SessionSlot::new(),
            error: None,
            alert: None,
            notice: None,
            model: config.model.clone(),
            replay_warn_threshold: config.ui.replay_warn_threshold,
            replay_warned: false,
            conversation_start: 0,
        }
    }

    /// Request the first session, built from the empty transcript
    pub fn start(&mut self) -> Vec<Effect> {
        self.request_session().into_iter().collect()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.map(ErrorFlag::message)
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn draft(&self) -> &str {
        self.composer.content()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Number of session creations requested so far
    pub fn session_creations(&self) -> u64 {
        self.session.creations()
    }

    pub fn live_session(&self) -> Option<&ChatSession> {
        self.session.live()
    }

    /// Replace the uncommitted draft
    pub fn on_draft_change(&mut self, text: impl Into<String>) {
        self.composer.set_content(text);
    }

    /// Insert pasted text into the draft; ignored under an alert
    pub fn on_paste(&mut self, text: &str) {
        if self.alert.is_none() {
            self.composer.paste(text);
        }
    }

    /// Dispatch a terminal event
    pub fn handle_event(&mut self, event: TuiEvent) -> Vec<Effect> {
        match event {
            TuiEvent::Key(key) => self.on_key_press(key),
            TuiEvent::Paste(text) => {
                self.on_paste(&text);
                Vec::new()
            }
            TuiEvent::Resize(..) | TuiEvent::Tick => Vec::new(),
        }
    }

    /// Handle a key press. Enter commits the draft.
    pub fn on_key_press(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.kind != KeyEventKind::Press {
            return Vec::new();
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Effect::Quit];
        }

        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.alert = None;
            }
            return Vec::new();
        }

        match key.code {
            KeyCode::PageUp => {
                self.history.scroll_up(SCROLL_STEP);
                return Vec::new();
            }
            KeyCode::PageDown => {
                self.history.scroll_down(SCROLL_STEP);
                return Vec::new();
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => self.send_message(text),
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => Vec::new(),
        }
    }

    /// Commit `text` as a user message and forward it to the live session.
    ///
    /// Blank text is rejected. While a send is outstanding the text goes back
    /// into the draft. Without a live session the message is recorded but not
    /// forwarded.
    pub fn send_message(&mut self, text: impl Into<String>) -> Vec<Effect> {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("Ignoring empty message");
            return Vec::new();
        }

        if self.session.is_sending() {
            debug!("Send already in flight, keeping draft");
            self.composer.set_content(text);
            self.notice = Some("Still waiting for the previous reply".to_string());
            return Vec::new();
        }

        self.composer.clear();
        self.notice = None;

        let mut effects = self.record(Message::user(text.clone()));

        match self.session.live() {
            Some(session) => {
                debug!(session = %session.id(), "Forwarding message");
                effects.push(Effect::Send {
                    generation: self.transcript.generation(),
                    session: session.clone(),
                    text,
                });
                self.session.begin_send();
            }
            None => {
                warn!(state = %self.session.state(), "No live session, message not forwarded");
            }
        }

        effects
    }

    /// Fold an adapter outcome back into the view
    pub fn apply(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::SessionCreated { generation, result } => {
                match self.session.complete(generation, result) {
                    Completion::Installed => {
                        // A send failure stays flagged until the next reply
                        if self.error == Some(ErrorFlag::Session) {
                            self.error = None;
                        }
                    }
                    Completion::Failed(_) => {
                        self.error = Some(ErrorFlag::Session);
                    }
                    Completion::Stale => {}
                }
                Vec::new()
            }
            AppEvent::ReplyReceived { generation, result } => {
                if generation < self.conversation_start {
                    debug!(generation, "Dropping reply from a previous conversation");
                    return Vec::new();
                }
                self.session.end_send();
                match result {
                    Ok((session, reply)) => self.accept_reply(session, reply),
                    Err(err) => {
                        self.reject_send(err);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn accept_reply(&mut self, session: ChatSession, reply: String) -> Vec<Effect> {
        let effects = self.record(Message::bot(reply));
        self.session.adopt(session, self.transcript.generation());
        self.error = None;
        effects
    }

    fn reject_send(&mut self, err: SessionError) {
        warn!(error = %err, "Send failed");
        self.alert = Some(Alert::disallowed_content());
        self.error = Some(ErrorFlag::Send);
    }

    /// Append to the transcript and request a rebuild for the new generation
    fn record(&mut self, message: Message) -> Vec<Effect> {
        self.transcript.push(message);
        self.history.scroll_to_bottom();
        self.request_session().into_iter().collect()
    }

    fn request_session(&mut self) -> Option<Effect> {
        let generation = self.transcript.generation();
        if !self.session.request(generation) {
            return None;
        }
        Some(self.create_effect(generation))
    }

    fn create_effect(&mut self, generation: u64) -> Effect {
        let replayed = self.transcript.len();
        if replayed > self.replay_warn_threshold && !self.replay_warned {
            self.replay_warned = true;
            warn!(
                replayed,
                threshold = self.replay_warn_threshold,
                "Session rebuilds now replay a long transcript"
            );
            self.notice = Some(format!(
                "Long conversation: each message replays {} earlier ones",
                replayed
            ));
        }

        Effect::CreateSession {
            generation,
            history: self.transcript.messages().to_vec(),
        }
    }

    /// Throw away the transcript and session and start over
    pub fn new_conversation(&mut self) -> Vec<Effect> {
        let generation = self.transcript.clear();
        self.conversation_start = generation;
        self.session.reset();
        self.error = None;
        self.alert = None;
        self.notice = None;
        self.replay_warned = false;
        self.history.scroll_to_bottom();
        info!(generation, "Started a new conversation");
        self.request_session().into_iter().collect()
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> Vec<Effect> {
        match command.command {
            SlashCommand::Help => {
                self.alert = Some(Alert::info("Help", get_help_text()));
                Vec::new()
            }
            SlashCommand::New => self.new_conversation(),
            SlashCommand::Retry => {
                let generation = self.transcript.generation();
                if self.session.retry(generation) {
                    info!(generation, "Retrying session creation");
                    self.notice = None;
                    vec![self.create_effect(generation)]
                } else {
                    self.notice = Some("Session is not in an error state".to_string());
                    Vec::new()
                }
            }
            SlashCommand::Quit => vec![Effect::Quit],
        }
    }

    /// Draw the whole screen
    pub fn render(&self, frame: &mut Frame) {
        let banner_height = u16::from(self.error.is_some());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(banner_height),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(frame.size());

        let title = Line::from(vec![Span::styled(
            "AI ChatBot powered by Google Gemini",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )]);
        frame.render_widget(Paragraph::new(title), chunks[0]);

        frame.render_widget(self.history.widget(self.transcript.messages()), chunks[1]);

        if let Some(error) = self.error() {
            frame.render_widget(ErrorBanner { message: error }, chunks[2]);
        }

        frame.render_widget(
            StatusLine {
                state: self.session.state(),
                model: &self.model,
                notice: self.notice.as_deref(),
            },
            chunks[3],
        );

        frame.render_widget(&self.composer, chunks[4]);

        if let Some(alert) = &self.alert {
            frame.render_widget(alert, frame.size());
        }
    }
}
