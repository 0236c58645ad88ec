//! HTTP API server for external control
//!
//! This module exposes the recorder's three controls as a REST API:
//! - POST /record/start/audio - Start recording screen + microphone
//! - POST /record/start/video - Start recording screen only
//! - POST /record/stop - Stop and finalize the active recording
//! - GET /record/status - Query recorder state
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
