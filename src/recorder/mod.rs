//! Recording lifecycle
//!
//! This module provides the `Recorder` that owns:
//! - The Idle/Recording/Finalizing state machine
//! - The paced screen capture loop and optional audio track of a session
//! - Finalization: closing both files and muxing them into the final output

#[allow(clippy::module_inception)]
mod recorder;
mod session;
mod state;

pub use recorder::Recorder;
pub use session::SessionSettings;
pub use state::{RecorderStatus, RecordingState, SessionInfo, SessionReport};
