use super::frame::Frame;
use crate::error::{RecorderError, RecorderResult};

/// A capturable display
///
/// Implementations block in `capture` for as long as the platform needs to
/// produce a snapshot; the capture loop owns pacing.
pub trait ScreenSource: Send {
    /// Display name for logging
    fn name(&self) -> &str;

    /// Frame size in pixels
    fn size(&self) -> (u32, u32);

    /// Grab one full-screen snapshot
    fn capture(&mut self) -> RecorderResult<Frame>;
}

#[cfg(feature = "capture")]
pub use self::xcap_screen::PrimaryScreen;

#[cfg(feature = "capture")]
mod xcap_screen {
    use super::*;
    use tracing::info;
    use xcap::Monitor;

    /// The primary monitor, captured through xcap
    pub struct PrimaryScreen {
        monitor: Monitor,
        name: String,
        width: u32,
        height: u32,
    }

    impl PrimaryScreen {
        pub fn open() -> RecorderResult<Self> {
            let mut monitors = Monitor::all()
                .map_err(|e| RecorderError::ScreenCapture(format!("Failed to list monitors: {}", e)))?;
            if monitors.is_empty() {
                return Err(RecorderError::ScreenCapture("No monitor found".to_string()));
            }

            let idx = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);
            let monitor = monitors.swap_remove(idx);
            let name = monitor.name().to_string();

            // Scaled displays report logical size; the encoder needs the
            // size of what capture_image actually returns.
            let first = monitor
                .capture_image()
                .map_err(|e| RecorderError::ScreenCapture(e.to_string()))?;
            let (width, height) = (first.width(), first.height());

            info!("Capturing monitor '{}' ({}x{})", name, width, height);

            Ok(Self {
                monitor,
                name,
                width,
                height,
            })
        }
    }

    impl ScreenSource for PrimaryScreen {
        fn name(&self) -> &str {
            &self.name
        }

        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn capture(&mut self) -> RecorderResult<Frame> {
            let image = self
                .monitor
                .capture_image()
                .map_err(|e| RecorderError::ScreenCapture(e.to_string()))?;

            let (width, height) = (image.width(), image.height());
            Frame::new(width, height, image.into_raw())
        }
    }
}
