use super::frame::BgrFrame;
use crate::error::{RecorderError, RecorderResult};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sink for encoded screen frames
pub trait VideoWriter: Send {
    /// Append one frame
    fn write_frame(&mut self, frame: &BgrFrame) -> RecorderResult<()>;

    /// Frames appended so far
    fn frames_written(&self) -> u64;

    /// Flush and close the container
    fn finish(self: Box<Self>) -> RecorderResult<()>;
}

/// Encoder parameters for the AVI stream
#[derive(Debug, Clone)]
pub struct VideoWriterSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// ffmpeg encoder name (e.g. "mpeg4")
    pub codec: String,
    /// FourCC written to the stream header (e.g. "XVID")
    pub tag: String,
    pub ffmpeg_path: String,
}

/// Encodes raw BGR24 frames into an AVI file through an ffmpeg child process
pub struct FfmpegAviWriter {
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames: u64,
}

/// How long a freshly spawned encoder gets to reject its arguments
const STARTUP_GRACE: Duration = Duration::from_millis(150);

impl FfmpegAviWriter {
    /// Start the encoder for `path`
    ///
    /// Fails with `VideoWriterOpen` when the target is not writable, the
    /// codec is unknown to ffmpeg, or the encoder exits right after start.
    pub fn open(path: &Path, settings: &VideoWriterSettings) -> RecorderResult<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(RecorderError::VideoWriterOpen(format!(
                "Invalid frame size {}x{}",
                settings.width, settings.height
            )));
        }

        // Fail before spawning anything when the target is not writable
        File::create(path).map_err(|e| {
            RecorderError::VideoWriterOpen(format!("{}: {}", path.display(), e))
        })?;

        Self::spawn(path, settings).map_err(|e| {
            if let Err(rm) = std::fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), rm);
            }
            e
        })
    }

    fn spawn(path: &Path, settings: &VideoWriterSettings) -> RecorderResult<Self> {
        check_encoder(&settings.ffmpeg_path, &settings.codec)?;

        let args = Self::build_args(path, settings);
        info!("Starting video encoder: {} {:?}", settings.ffmpeg_path, args);

        let mut process = Command::new(&settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RecorderError::VideoWriterOpen(format!(
                    "Failed to start {}: {}",
                    settings.ffmpeg_path, e
                ))
            })?;

        std::thread::sleep(STARTUP_GRACE);
        let exited = process.try_wait().map_err(|e| {
            RecorderError::VideoWriterOpen(format!("Failed to poll encoder: {}", e))
        })?;
        if let Some(status) = exited {
            let output = process.wait_with_output().ok();
            let stderr = output
                .map(|o| String::from_utf8_lossy(&o.stderr).trim().to_string())
                .unwrap_or_default();
            return Err(RecorderError::VideoWriterOpen(format!(
                "Encoder exited with {} on start: {}",
                status, stderr
            )));
        }

        let stdin = match process.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(RecorderError::VideoWriterOpen(
                    "Failed to capture encoder stdin".to_string(),
                ));
            }
        };

        Ok(Self {
            process: Some(process),
            stdin: Some(stdin),
            path: path.to_path_buf(),
            width: settings.width,
            height: settings.height,
            frames: 0,
        })
    }

    /// ffmpeg arguments: raw BGR24 on stdin, AVI with the configured codec out
    pub fn build_args(path: &Path, settings: &VideoWriterSettings) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "bgr24".to_string(),
            "-s".to_string(),
            format!("{}x{}", settings.width, settings.height),
            "-r".to_string(),
            settings.frame_rate.to_string(),
            "-i".to_string(),
            "-".to_string(),
            // 4:2:0 needs even dimensions
            "-vf".to_string(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
            "-c:v".to_string(),
            settings.codec.clone(),
            "-vtag".to_string(),
            settings.tag.clone(),
            "-q:v".to_string(),
            "5".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            path.to_string_lossy().to_string(),
        ]
    }
}

/// Ask ffmpeg to describe `codec`; unknown encoders are not listed
fn check_encoder(ffmpeg_path: &str, codec: &str) -> RecorderResult<()> {
    let output = Command::new(ffmpeg_path)
        .args(["-hide_banner", "-h", &format!("encoder={}", codec)])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| {
            RecorderError::VideoWriterOpen(format!("Failed to run {}: {}", ffmpeg_path, e))
        })?;

    if !output.status.success() {
        return Err(RecorderError::VideoWriterOpen(format!(
            "{} exited with {} while checking encoder '{}'",
            ffmpeg_path, output.status, codec
        )));
    }

    let description = String::from_utf8_lossy(&output.stdout);
    if !description.contains(&format!("Encoder {} ", codec)) {
        return Err(RecorderError::VideoWriterOpen(format!(
            "Encoder '{}' is not available in {}",
            codec, ffmpeg_path
        )));
    }

    debug!("Encoder '{}' available", codec);
    Ok(())
}

impl VideoWriter for FfmpegAviWriter {
    fn write_frame(&mut self, frame: &BgrFrame) -> RecorderResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(RecorderError::VideoWrite(format!(
                "Frame size changed from {}x{} to {}x{}",
                self.width, self.height, frame.width, frame.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RecorderError::VideoWrite("Encoder already closed".to_string()))?;

        stdin
            .write_all(&frame.data)
            .map_err(|e| RecorderError::VideoWrite(format!("Failed to write frame: {}", e)))?;

        self.frames += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(mut self: Box<Self>) -> RecorderResult<()> {
        // Closing stdin lets ffmpeg flush and write the AVI index
        drop(self.stdin.take());

        let Some(process) = self.process.take() else {
            return Ok(());
        };

        let output = process
            .wait_with_output()
            .map_err(|e| RecorderError::VideoWrite(format!("Failed to wait for encoder: {}", e)))?;

        if !output.status.success() {
            return Err(RecorderError::VideoWrite(format!(
                "Encoder exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(
            "Video written: {} ({} frames)",
            self.path.display(),
            self.frames
        );
        Ok(())
    }
}

impl Drop for FfmpegAviWriter {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            drop(self.stdin.take());
            match process.try_wait() {
                Ok(Some(status)) => debug!("Encoder already exited: {}", status),
                _ => {
                    warn!("Video writer dropped without finish, killing encoder");
                    let _ = process.kill();
                    let _ = process.wait();
                }
            }
        }
    }
}
