use super::clock::FrameClock;
use super::frame::BgrFrame;
use super::screen::ScreenSource;
use super::writer::VideoWriter;
use crate::error::RecorderResult;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest single sleep between cancellation checks
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Counters for one video capture run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    /// Fresh screen grabs
    pub frames_captured: u64,
    /// Slots filled by repeating the previous grab
    pub frames_duplicated: u64,
    /// Frames handed to the writer
    pub frames_written: u64,
    pub elapsed_secs: f64,
}

/// Screen capture loop: grab, convert, write, wait for the next slot
pub struct VideoCapture {
    screen: Box<dyn ScreenSource>,
    writer: Box<dyn VideoWriter>,
    frame_rate: f64,
    stats: VideoStats,
}

impl VideoCapture {
    pub fn new(
        screen: Box<dyn ScreenSource>,
        writer: Box<dyn VideoWriter>,
        frame_rate: f64,
    ) -> Self {
        Self {
            screen,
            writer,
            frame_rate,
            stats: VideoStats::default(),
        }
    }

    /// Run until `cancel` fires or capture/write fails. Blocking.
    pub fn run(&mut self, cancel: &CancellationToken) -> RecorderResult<()> {
        let started = Instant::now();
        let mut clock = FrameClock::starting_at(started, self.frame_rate);

        info!(
            "Video capture started on '{}' at {} fps",
            self.screen.name(),
            self.frame_rate
        );

        let result = self.capture_until_cancelled(&mut clock, cancel);
        self.stats.elapsed_secs = started.elapsed().as_secs_f64();

        match &result {
            Ok(()) => info!(
                "Video capture stopped: {} captured, {} repeated, {:.1}s",
                self.stats.frames_captured, self.stats.frames_duplicated, self.stats.elapsed_secs
            ),
            Err(e) => warn!("Video capture aborted: {}", e),
        }

        result
    }

    fn capture_until_cancelled(
        &mut self,
        clock: &mut FrameClock,
        cancel: &CancellationToken,
    ) -> RecorderResult<()> {
        while !cancel.is_cancelled() {
            let frame = self.screen.capture()?.to_bgr();
            self.write(&frame)?;
            self.stats.frames_captured += 1;
            clock.advance(1);

            let missed = clock.missed_slots(Instant::now());
            if missed > 0 {
                debug!("Capture fell behind by {} frames, repeating last frame", missed);
                for _ in 0..missed {
                    self.write(&frame)?;
                }
                self.stats.frames_duplicated += missed;
                clock.advance(missed);
            }

            sleep_until(clock.next_deadline(), cancel);
        }

        Ok(())
    }

    fn write(&mut self, frame: &BgrFrame) -> RecorderResult<()> {
        self.writer.write_frame(frame)?;
        self.stats.frames_written += 1;
        Ok(())
    }

    pub fn stats(&self) -> &VideoStats {
        &self.stats
    }

    /// Release the writer, returning the final counters
    pub fn finish(self) -> (VideoStats, RecorderResult<()>) {
        let result = self.writer.finish();
        (self.stats, result)
    }
}

fn sleep_until(deadline: Instant, cancel: &CancellationToken) {
    loop {
        let now = Instant::now();
        if now >= deadline || cancel.is_cancelled() {
            return;
        }
        std::thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecorderError;
    use crate::video::frame::Frame;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct SlowScreen {
        delay: Duration,
        grabs: u64,
        fail_after: Option<u64>,
    }

    impl ScreenSource for SlowScreen {
        fn name(&self) -> &str {
            "test"
        }

        fn size(&self) -> (u32, u32) {
            (4, 2)
        }

        fn capture(&mut self) -> RecorderResult<Frame> {
            if Some(self.grabs) == self.fail_after {
                return Err(RecorderError::ScreenCapture("display gone".to_string()));
            }
            std::thread::sleep(self.delay);
            self.grabs += 1;
            Ok(Frame::filled(4, 2, [self.grabs as u8, 0, 0, 255]))
        }
    }

    struct CountingWriter {
        frames: Arc<AtomicU64>,
    }

    impl VideoWriter for CountingWriter {
        fn write_frame(&mut self, frame: &BgrFrame) -> RecorderResult<()> {
            assert_eq!(frame.data.len(), BgrFrame::byte_len(4, 2));
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn frames_written(&self) -> u64 {
            self.frames.load(Ordering::SeqCst)
        }

        fn finish(self: Box<Self>) -> RecorderResult<()> {
            Ok(())
        }
    }

    fn capture(delay_ms: u64, fail_after: Option<u64>, fps: f64) -> (VideoCapture, Arc<AtomicU64>) {
        let frames = Arc::new(AtomicU64::new(0));
        let capture = VideoCapture::new(
            Box::new(SlowScreen {
                delay: Duration::from_millis(delay_ms),
                grabs: 0,
                fail_after,
            }),
            Box::new(CountingWriter {
                frames: Arc::clone(&frames),
            }),
            fps,
        );
        (capture, frames)
    }

    #[test]
    fn test_cancelled_before_start_writes_nothing() {
        let (mut capture, frames) = capture(0, None, 20.0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        capture.run(&cancel).unwrap();
        assert_eq!(frames.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_slow_capture_is_padded_to_frame_rate() {
        let (mut capture, frames) = capture(120, None, 20.0);
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(600));
                cancel.cancel();
            })
        };

        capture.run(&cancel).unwrap();
        stopper.join().unwrap();

        let stats = capture.stats().clone();
        assert!(stats.frames_duplicated > 0, "120ms grabs at 20fps must repeat frames");
        assert_eq!(stats.frames_written, frames.load(Ordering::SeqCst));
        assert_eq!(
            stats.frames_written,
            stats.frames_captured + stats.frames_duplicated
        );

        // Written frames follow wall-clock time, within a couple of slots
        let expected = stats.elapsed_secs * 20.0;
        assert!(
            (stats.frames_written as f64 - expected).abs() <= 4.0,
            "wrote {} frames over {:.2}s",
            stats.frames_written,
            stats.elapsed_secs
        );
    }

    #[test]
    fn test_fast_capture_is_paced() {
        let (mut capture, _) = capture(0, None, 10.0);
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(500));
                cancel.cancel();
            })
        };

        capture.run(&cancel).unwrap();
        stopper.join().unwrap();

        // ~5 slots in 500ms at 10 fps, never a busy loop
        let stats = capture.stats();
        assert!(stats.frames_captured <= 7, "captured {}", stats.frames_captured);
        assert!(stats.frames_captured >= 3, "captured {}", stats.frames_captured);
    }

    #[test]
    fn test_capture_error_ends_loop() {
        let (mut capture, frames) = capture(0, Some(3), 50.0);
        let cancel = CancellationToken::new();

        let err = capture.run(&cancel).unwrap_err();
        assert!(matches!(err, RecorderError::ScreenCapture(_)));
        assert!(frames.load(Ordering::SeqCst) >= 3);

        let (stats, finish) = capture.finish();
        assert!(finish.is_ok());
        assert_eq!(stats.frames_captured, 3);
    }
}
