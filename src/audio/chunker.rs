use super::backend::AudioFrame;

/// Re-blocks device buffers of arbitrary length into fixed-size chunks
///
/// Timestamps come from the running sample count, so they stay exact even
/// when the device delivers irregular buffer sizes.
#[derive(Debug)]
pub struct ChunkAssembler {
    sample_rate: u32,
    channels: u16,
    chunk_samples: usize,
    pending: Vec<i16>,
    frames_emitted: u64,
}

impl ChunkAssembler {
    pub fn new(sample_rate: u32, channels: u16, chunk_frames: usize) -> Self {
        let chunk_samples = chunk_frames.max(1) * channels.max(1) as usize;
        Self {
            sample_rate,
            channels,
            chunk_samples,
            pending: Vec::with_capacity(chunk_samples),
            frames_emitted: 0,
        }
    }

    /// Append interleaved samples, returning every chunk that became full
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioFrame> {
        let mut ready = Vec::new();
        let mut rest = samples;

        while !rest.is_empty() {
            let take = (self.chunk_samples - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.pending.len() == self.chunk_samples {
                let samples = std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.chunk_samples),
                );
                ready.push(self.emit(samples));
            }
        }

        ready
    }

    /// Emit the trailing partial chunk, if any
    pub fn flush(&mut self) -> Option<AudioFrame> {
        if self.pending.is_empty() {
            return None;
        }
        let samples = std::mem::take(&mut self.pending);
        Some(self.emit(samples))
    }

    fn emit(&mut self, samples: Vec<i16>) -> AudioFrame {
        let timestamp_ms = self.frames_emitted * 1000 / self.sample_rate.max(1) as u64;
        self.frames_emitted += (samples.len() / self.channels.max(1) as usize) as u64;

        AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        }
    }
}

/// f32 sample in [-1.0, 1.0] to i16
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Unsigned 16-bit sample (midpoint 32768) to i16
pub fn u16_to_i16(sample: u16) -> i16 {
    (sample as i32 - 32768) as i16
}
