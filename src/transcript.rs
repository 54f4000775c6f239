//! The conversation as shown to the user: an append-only list of messages.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Role name used by the Gemini `contents` array
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "model",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Bot => "Bot",
        }
    }
}

/// A single entry in the transcript. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    role: Role,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self::at(role, text, Local::now())
    }

    pub fn at(role: Role, text: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            text: text.into(),
            role,
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Role::Bot, text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Ordered conversation history.
///
/// The only mutation is [`Transcript::push`]. Each push bumps the
/// generation, which the session slot uses to decide when a rebuild is due.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    generation: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the new generation
    pub fn push(&mut self, message: Message) -> u64 {
        self.messages.push(message);
        self.generation += 1;
        self.generation
    }

    /// Drop every message. Counts as a mutation, so the generation moves on
    /// and anything built from the old conversation is recognisably stale.
    pub fn clear(&mut self) -> u64 {
        self.messages.clear();
        self.generation += 1;
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
