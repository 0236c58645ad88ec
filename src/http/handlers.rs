use super::state::AppState;
use crate::error::RecorderError;
use crate::recorder::{SessionInfo, SessionReport};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub status: String,
    pub message: String,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub message: String,
    pub report: Option<SessionReport>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

fn error_response(err: &RecorderError) -> Response {
    let status = match err {
        RecorderError::InvalidState { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            code: err.code().to_string(),
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /record/start/audio
/// Start recording the screen and microphone
pub async fn start_with_audio(State(state): State<AppState>) -> Response {
    start(state, true).await
}

/// POST /record/start/video
/// Start recording the screen only
pub async fn start_without_audio(State(state): State<AppState>) -> Response {
    start(state, false).await
}

async fn start(state: AppState, with_audio: bool) -> Response {
    match state.recorder.start(with_audio).await {
        Ok(session) => {
            info!("Recording started: {}", session.session_id);
            (
                StatusCode::OK,
                Json(StartRecordingResponse {
                    status: "recording".to_string(),
                    message: format!(
                        "Recording to {}",
                        session.paths.final_output.display()
                    ),
                    session,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(&e)
        }
    }
}

/// POST /record/stop
/// Stop the active recording and wait for its output
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    match state.recorder.stop().await {
        Ok(Some(report)) => {
            let message = match &report.output {
                Some(path) => format!("Recording saved to {}", path.display()),
                None => format!("Recording stopped with errors: {}", report.errors.join("; ")),
            };
            (
                StatusCode::OK,
                Json(StopRecordingResponse {
                    status: "stopped".to_string(),
                    message,
                    report: Some(report),
                }),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                status: "idle".to_string(),
                message: "Nothing to stop".to_string(),
                report: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            error_response(&e)
        }
    }
}

/// GET /record/status
/// Current recorder state, active session and last result
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.recorder.status().await))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
