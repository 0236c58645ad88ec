use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::session::{ActiveSession, SessionSettings};
use super::state::{RecorderStatus, RecordingState, SessionInfo, SessionReport};
use crate::devices::CaptureDevices;
use crate::error::{RecorderError, RecorderResult};
use crate::mux::Muxer;
use crate::output::OutputPaths;

/// Single authority over the recording lifecycle
///
/// Idle → Recording → Finalizing → Idle. Cloning yields another handle to
/// the same recorder.
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<Inner>,
}

struct Inner {
    settings: SessionSettings,
    devices: Arc<dyn CaptureDevices>,
    muxer: Arc<dyn Muxer>,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    state: RecordingState,
    current: Option<SessionInfo>,
    active: Option<ActiveSession>,
    last_report: Option<SessionReport>,
    last_error: Option<String>,
}

impl Recorder {
    pub fn new(
        settings: SessionSettings,
        devices: Arc<dyn CaptureDevices>,
        muxer: Arc<dyn Muxer>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                devices,
                muxer,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Start a session; rejected unless the recorder is idle
    ///
    /// Returns once the writer and devices are open and capture is running.
    pub async fn start(&self, with_audio: bool) -> RecorderResult<SessionInfo> {
        // Held across device opening so start/stop cannot interleave
        let mut slot = self.inner.slot.lock().await;

        if slot.state != RecordingState::Idle {
            warn!("Start rejected: recorder is {}", slot.state);
            return Err(RecorderError::InvalidState {
                action: "start recording",
                state: slot.state,
            });
        }

        let settings = &self.inner.settings;
        if let Err(e) = tokio::fs::create_dir_all(&settings.output_dir).await {
            let e = RecorderError::VideoWriterOpen(format!(
                "Output directory {}: {}",
                settings.output_dir.display(),
                e
            ));
            error!("{}", e);
            slot.last_error = Some(e.to_string());
            return Err(e);
        }

        let paths = OutputPaths::now(&settings.output_dir, with_audio);
        if paths.final_output.exists() {
            warn!("{} already exists and will be overwritten", paths.final_output.display());
        }

        let info = SessionInfo::new(with_audio, paths);
        info!(
            "Starting session {} ({})",
            info.session_id,
            if with_audio { "with audio" } else { "video only" }
        );

        let session = match ActiveSession::open(info.clone(), Arc::clone(&self.inner.devices), settings).await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to start recording: {}", e);
                slot.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.watch_for_failure(&session);

        slot.state = RecordingState::Recording;
        slot.current = Some(info.clone());
        slot.active = Some(session);
        slot.last_error = None;

        Ok(info)
    }

    /// Stop the active session and finalize its output
    ///
    /// Returns `Ok(None)` when there is nothing to stop (idle, or already
    /// finalizing).
    pub async fn stop(&self) -> RecorderResult<Option<SessionReport>> {
        self.finalize_active(None).await
    }

    pub async fn status(&self) -> RecorderStatus {
        let slot = self.inner.slot.lock().await;
        RecorderStatus {
            state: slot.state,
            session: slot.current.clone(),
            last_report: slot.last_report.clone(),
            last_error: slot.last_error.clone(),
        }
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.slot.lock().await.state
    }

    async fn finalize_active(&self, only: Option<&str>) -> RecorderResult<Option<SessionReport>> {
        let session = {
            let mut slot = self.inner.slot.lock().await;

            match slot.state {
                RecordingState::Idle => {
                    info!("Stop requested while idle, nothing to do");
                    return Ok(None);
                }
                RecordingState::Finalizing => {
                    info!("Stop requested while finalizing, already stopping");
                    return Ok(None);
                }
                RecordingState::Recording => {}
            }

            if let (Some(id), Some(current)) = (only, slot.current.as_ref()) {
                if current.session_id != id {
                    return Ok(None);
                }
            }

            slot.state = RecordingState::Finalizing;
            slot.active.take()
        };

        let Some(session) = session else {
            let mut slot = self.inner.slot.lock().await;
            slot.state = RecordingState::Idle;
            slot.current = None;
            return Ok(None);
        };

        info!("Stopping session {}", session.info().session_id);
        let report = session
            .finalize(self.inner.muxer.as_ref(), self.inner.settings.keep_sources)
            .await;

        let mut slot = self.inner.slot.lock().await;
        slot.state = RecordingState::Idle;
        slot.current = None;
        slot.last_error = (!report.errors.is_empty()).then(|| report.errors.join("; "));
        slot.last_report = Some(report.clone());

        Ok(Some(report))
    }

    /// Finalize on our own when a capture loop dies mid-session
    fn watch_for_failure(&self, session: &ActiveSession) {
        let recorder = self.clone();
        let cancel = session.cancel_token();
        let failed = session.failure_flag();
        let session_id = session.info().session_id.clone();

        tokio::spawn(async move {
            cancel.cancelled().await;
            if !failed.load(Ordering::SeqCst) {
                return;
            }

            warn!("Capture failed, finalizing session {}", session_id);
            if let Err(e) = recorder.finalize_active(Some(&session_id)).await {
                error!("Failed to finalize session {}: {}", session_id, e);
            }
        });
    }
}
