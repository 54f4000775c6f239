use crate::error::SessionError;
use crate::llm::ChatSession;
use strum::Display;
use tracing::{debug, info, warn};

/// Lifecycle of the model session as seen by the chat view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Sending,
    Error,
}

/// What happened when a creation result came back
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The session now reflects the requested generation
    Installed,
    /// A newer generation was requested meanwhile; the result was dropped
    Stale,
    /// Creation failed; the slot is empty until the next request
    Failed(SessionError),
}

/// Owns the live session handle and tracks which transcript generation it
/// was built from.
///
/// A rebuild is requested at most once per generation. After a failed
/// creation nothing is requested until the transcript changes again or the
/// user asks for a retry.
#[derive(Debug, Default)]
pub struct SessionSlot {
    live: Option<ChatSession>,
    live_generation: Option<u64>,
    requested: Option<u64>,
    failed: bool,
    sending: bool,
    creations: u64,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a session built from `generation`. Returns false when that
    /// generation was already requested.
    pub fn request(&mut self, generation: u64) -> bool {
        if self.requested == Some(generation) {
            debug!(generation, "Session rebuild already requested");
            return false;
        }
        self.requested = Some(generation);
        self.failed = false;
        self.creations += 1;
        debug!(generation, "Requested session rebuild");
        true
    }

    /// Explicit user retry after a failed creation
    pub fn retry(&mut self, generation: u64) -> bool {
        if !self.failed {
            return false;
        }
        self.requested = None;
        self.request(generation)
    }

    /// Fold a creation result into the slot
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<ChatSession, SessionError>,
    ) -> Completion {
        if self.requested != Some(generation) {
            debug!(generation, requested = ?self.requested, "Dropping stale session result");
            return Completion::Stale;
        }

        match result {
            Ok(session) => {
                info!(generation, session = %session.id(), "Session ready");
                self.live = Some(session);
                self.live_generation = Some(generation);
                self.failed = false;
                Completion::Installed
            }
            Err(err) => {
                warn!(generation, error = %err, "Session creation failed");
                self.live = None;
                self.live_generation = None;
                self.failed = true;
                Completion::Failed(err)
            }
        }
    }

    /// Install the handle returned by a successful send. Its history already
    /// contains the exchange, so it reflects `generation`.
    pub fn adopt(&mut self, session: ChatSession, generation: u64) {
        if self.live_generation.is_some_and(|live| live > generation) {
            return;
        }
        self.live = Some(session);
        self.live_generation = Some(generation);
        self.failed = false;
    }

    /// Forget the live session and any outstanding send or failure. The next
    /// `request` starts from scratch.
    pub fn reset(&mut self) {
        self.live = None;
        self.live_generation = None;
        self.failed = false;
        self.sending = false;
    }

    /// The session a send can go out on, if any
    pub fn live(&self) -> Option<&ChatSession> {
        self.live.as_ref()
    }

    pub fn live_generation(&self) -> Option<u64> {
        self.live_generation
    }

    pub fn begin_send(&mut self) {
        self.sending = true;
    }

    pub fn end_send(&mut self) {
        self.sending = false;
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Number of creations requested so far
    pub fn creations(&self) -> u64 {
        self.creations
    }

    pub fn state(&self) -> SessionState {
        if self.sending {
            SessionState::Sending
        } else if self.failed {
            SessionState::Error
        } else if self.requested.is_some() && self.requested != self.live_generation {
            SessionState::Initializing
        } else if self.live.is_some() {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }
}
