//! Combining the temporary video and audio tracks into the final container
//!
//! ffmpeg is run with bit-exact flags and metadata stripped, so re-muxing the
//! same inputs with the same ffmpeg build yields identical bytes. Different
//! builds or encoder versions may still differ.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::{MuxConfig, RecorderConfig};
use crate::error::{RecorderError, RecorderResult};

/// Attaches an audio track to a video file
#[async_trait::async_trait]
pub trait Muxer: Send + Sync {
    /// Write `output` from `video` + `audio`. Must not touch the inputs.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()>;

    fn name(&self) -> &str;
}

/// Muxer backed by the ffmpeg executable
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    ffmpeg_path: String,
    video_codec: String,
    audio_codec: String,
}

impl FfmpegMuxer {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        video_codec: impl Into<String>,
        audio_codec: impl Into<String>,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            video_codec: video_codec.into(),
            audio_codec: audio_codec.into(),
        }
    }

    pub fn from_config(recorder: &RecorderConfig, mux: &MuxConfig) -> Self {
        Self::new(&recorder.ffmpeg_path, &mux.video_codec, &mux.audio_codec)
    }

    pub fn build_args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-i".to_string(),
            audio.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-shortest".to_string(),
            // Deterministic output for identical inputs
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-fflags".to_string(),
            "+bitexact".to_string(),
            "-flags:v".to_string(),
            "+bitexact".to_string(),
            "-flags:a".to_string(),
            "+bitexact".to_string(),
            "-threads".to_string(),
            "1".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()> {
        for input in [video, audio] {
            if !input.exists() {
                return Err(RecorderError::Mux(format!("{} does not exist", input.display())));
            }
        }

        let args = self.build_args(video, audio, output);
        info!("Muxing {} + {} -> {}", video.display(), audio.display(), output.display());

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RecorderError::Mux(format!("Failed to run {}: {}", self.ffmpeg_path, e)))?;

        if !result.status.success() {
            return Err(RecorderError::Mux(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Result of a successful session mux
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxedOutput {
    pub output: PathBuf,
    /// Sources that should have been deleted but could not be
    pub leftovers: Vec<PathBuf>,
}

/// Mux a session's tracks and delete them once the output exists
///
/// On failure the inputs and any partial output are left in place. Once the
/// output exists, a source that cannot be deleted is only reported.
pub async fn mux_session(
    muxer: &dyn Muxer,
    video: &Path,
    audio: &Path,
    output: &Path,
    keep_sources: bool,
) -> RecorderResult<MuxedOutput> {
    if let Err(e) = muxer.mux(video, audio, output).await {
        error!("{}", e);
        return Err(e);
    }

    if !output.exists() {
        let e = RecorderError::Mux(format!(
            "{} reported success but {} is missing",
            muxer.name(),
            output.display()
        ));
        error!("{}", e);
        return Err(e);
    }

    let mut leftovers = Vec::new();
    if !keep_sources {
        for source in [video, audio] {
            if let Err(e) = tokio::fs::remove_file(source).await {
                warn!("Failed to remove {}: {}", source.display(), e);
                leftovers.push(source.to_path_buf());
            }
        }
    }

    info!("Recording saved to {}", output.display());
    Ok(MuxedOutput {
        output: output.to_path_buf(),
        leftovers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct ConcatMuxer {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Muxer for ConcatMuxer {
        async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()> {
            if self.fail {
                return Err(RecorderError::Mux("codec missing".to_string()));
            }
            let mut bytes = tokio::fs::read(video).await?;
            bytes.extend(tokio::fs::read(audio).await?);
            tokio::fs::write(output, bytes).await?;
            Ok(())
        }

        fn name(&self) -> &str {
            "concat"
        }
    }

    fn inputs(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let video = dir.path().join("recorded_20240101_000000.avi");
        let audio = dir.path().join("recorded_20240101_000000.wav");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(&audio, b"audio").unwrap();
        (video, audio, dir.path().join("recorded_20240101_000000.mp4"))
    }

    #[test]
    fn test_build_args_maps_both_inputs() {
        let muxer = FfmpegMuxer::new("ffmpeg", "libx264", "aac");
        let args = muxer.build_args(Path::new("a.avi"), Path::new("a.wav"), Path::new("a.mp4"));

        let joined = args.join(" ");
        assert!(joined.starts_with("-y -loglevel error -i a.avi -i a.wav"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-fflags +bitexact"));
        assert_eq!(args.last().map(String::as_str), Some("a.mp4"));
    }

    #[tokio::test]
    async fn test_mux_session_deletes_sources_on_success() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir);

        let result = mux_session(&ConcatMuxer { fail: false }, &video, &audio, &output, false).await;

        let muxed = result.unwrap();
        assert_eq!(muxed.output, output);
        assert!(muxed.leftovers.is_empty());
        assert!(output.exists());
        assert!(!video.exists());
        assert!(!audio.exists());
    }

    #[tokio::test]
    async fn test_mux_session_keeps_sources_on_failure() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir);

        let err = mux_session(&ConcatMuxer { fail: true }, &video, &audio, &output, false)
            .await
            .unwrap_err();

        assert!(matches!(err, RecorderError::Mux(_)));
        assert!(video.exists());
        assert!(audio.exists());
    }

    #[tokio::test]
    async fn test_mux_session_keep_sources_option() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir);

        mux_session(&ConcatMuxer { fail: false }, &video, &audio, &output, true)
            .await
            .unwrap();

        assert!(output.exists());
        assert!(video.exists());
        assert!(audio.exists());
    }

    /// Writes the output without reading the inputs
    struct TouchMuxer;

    #[async_trait::async_trait]
    impl Muxer for TouchMuxer {
        async fn mux(&self, _video: &Path, _audio: &Path, output: &Path) -> RecorderResult<()> {
            tokio::fs::write(output, b"muxed").await?;
            Ok(())
        }

        fn name(&self) -> &str {
            "touch"
        }
    }

    #[tokio::test]
    async fn test_mux_session_cleanup_failure_keeps_output() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("recorded_20240101_000000.avi");
        std::fs::write(&video, b"video").unwrap();
        // A directory cannot be removed with remove_file
        let audio = dir.path().join("recorded_20240101_000000.wav");
        std::fs::create_dir(&audio).unwrap();
        let output = dir.path().join("recorded_20240101_000000.mp4");

        let muxed = mux_session(&TouchMuxer, &video, &audio, &output, false)
            .await
            .unwrap();

        assert_eq!(muxed.output, output);
        assert_eq!(muxed.leftovers, vec![audio.clone()]);
        assert!(output.exists());
        assert!(!video.exists());
    }

    #[tokio::test]
    async fn test_ffmpeg_muxer_missing_input() {
        let dir = TempDir::new().unwrap();
        let muxer = FfmpegMuxer::new("ffmpeg", "libx264", "aac");

        let err = muxer
            .mux(
                &dir.path().join("none.avi"),
                &dir.path().join("none.wav"),
                &dir.path().join("none.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecorderError::Mux(_)));
    }

    #[tokio::test]
    async fn test_ffmpeg_muxer_missing_binary() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir);
        let muxer = FfmpegMuxer::new("/nonexistent/ffmpeg", "libx264", "aac");

        let err = muxer.mux(&video, &audio, &output).await.unwrap_err();
        assert!(matches!(err, RecorderError::Mux(_)));
    }
}
