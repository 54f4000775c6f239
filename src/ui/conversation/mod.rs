//! Conversation UI components for the chat screen

pub mod alert;
pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod status;

pub use alert::{Alert, AlertKind, DISALLOWED_CONTENT_ALERT};
pub use commands::{ParsedCommand, SlashCommand, get_help_text, parse_slash_command};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use manager::{ChatView, SEND_FAILED, SESSION_FAILED};
pub use status::{ErrorBanner, StatusLine};
