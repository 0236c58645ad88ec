use crate::recorder::Recorder;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one recorder every control action goes through
    pub recorder: Recorder,
}

impl AppState {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}
