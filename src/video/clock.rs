use std::time::{Duration, Instant};

/// Fixed-interval frame schedule
///
/// Slot `k` starts at `start + k * interval`. The capture loop emits one frame
/// per slot; slots that pass without a fresh capture are filled by repeating
/// the previous frame, so the stream length follows wall-clock time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    interval: Duration,
    emitted: u64,
}

impl FrameClock {
    pub fn new(frame_rate: f64) -> Self {
        Self::starting_at(Instant::now(), frame_rate)
    }

    pub fn starting_at(start: Instant, frame_rate: f64) -> Self {
        Self {
            start,
            interval: Duration::from_secs_f64(1.0 / frame_rate),
            emitted: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Record `n` frames written
    pub fn advance(&mut self, n: u64) {
        self.emitted += n;
    }

    /// Index of the slot `now` falls into
    pub fn current_slot(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_nanos() / self.interval.as_nanos().max(1)) as u64
    }

    /// Slots that fully elapsed without a frame
    pub fn missed_slots(&self, now: Instant) -> u64 {
        self.current_slot(now).saturating_sub(self.emitted)
    }

    /// Start of the next slot waiting for a frame
    pub fn next_deadline(&self) -> Instant {
        self.start + Duration::from_nanos(self.interval.as_nanos() as u64 * self.emitted)
    }
}
