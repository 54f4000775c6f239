pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod logging;
pub mod safety;
pub mod session;
pub mod transcript;
pub mod ui;

pub use config::Config;
pub use error::SessionError;
pub use llm::{ChatSession, GeminiClient, ModelBackend, SessionParams};
pub use ui::ChatView;
