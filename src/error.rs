//! Error types for the model session adapter.

use thiserror::Error;

/// Failures reported by a [`ModelBackend`](crate::llm::ModelBackend).
///
/// The chat view does not distinguish transient from permanent failures; the
/// message carried by each variant only ends up in the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session could not be created (or re-created) from the transcript
    #[error("session initialization failed: {0}")]
    Initialization(String),

    /// A single send on an existing session failed
    #[error("send failed: {0}")]
    Send(String),
}

impl SessionError {
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }

    pub fn send(message: impl Into<String>) -> Self {
        Self::Send(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_the_stage() {
        let err = SessionError::initialization("bad key");
        assert_eq!(err.to_string(), "session initialization failed: bad key");

        let err = SessionError::send("HTTP 500");
        assert_eq!(err.to_string(), "send failed: HTTP 500");
    }
}
