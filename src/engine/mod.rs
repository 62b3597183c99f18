//! Audio Engine Module
//!
//! Session configuration, the start/stop state machine, and the offline and
//! online callback loops.

pub mod config;
mod offline;
mod online;
pub mod session;
pub mod state;

pub use config::SessionConfig;
pub use session::AudioSession;
pub use state::{SessionState, SessionStatus};
