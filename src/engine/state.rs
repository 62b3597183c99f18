//! Session lifecycle state

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Where a session is in its single-use lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Configured, never started
    #[default]
    Idle,
    /// Device stream running; ends with `stop`
    Streaming,
    /// Rendered or stopped; the session cannot be started again
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Streaming => write!(f, "Streaming"),
            SessionState::Finished => write!(f, "Finished"),
        }
    }
}

/// Cloneable view of a session's `started` flag.
///
/// Safe to query from any thread, including from inside the data and stop
/// callbacks.
#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    started: Arc<AtomicBool>,
    callbacks: Arc<AtomicU64>,
}

impl SessionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the callback loop can deliver frames
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Data callbacks delivered so far
    pub fn callback_count(&self) -> u64 {
        self.callbacks.load(Ordering::Acquire)
    }

    pub(crate) fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::SeqCst);
    }

    pub(crate) fn record_callback(&self) {
        self.callbacks.fetch_add(1, Ordering::AcqRel);
    }
}
