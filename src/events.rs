use crate::error::SessionError;
use crate::llm::ChatSession;
use crate::transcript::Message;

/// Work the chat view asks the runtime to perform
#[derive(Debug, Clone)]
pub enum Effect {
    /// Build a session replaying `history`, tagged with the transcript
    /// generation it reflects
    CreateSession { generation: u64, history: Vec<Message> },

    /// Forward one user utterance on a copy of the live session.
    /// `generation` is the transcript generation of the user append.
    Send {
        generation: u64,
        session: ChatSession,
        text: String,
    },

    /// Leave the application
    Quit,
}

/// Outcomes of effects, fed back into the chat view
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A session creation finished
    SessionCreated {
        generation: u64,
        result: Result<ChatSession, SessionError>,
    },

    /// A send finished; on success carries the updated session and reply
    ReplyReceived {
        generation: u64,
        result: Result<(ChatSession, String), SessionError>,
    },
}

/// Terminal events the runtime forwards to the view
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Redraw tick
    Tick,
}

impl Effect {
    pub fn is_quit(&self) -> bool {
        matches!(self, Effect::Quit)
    }
}
