// Integration tests for audio file reading
//
// These tests verify that we can read WAV files and extract audio data correctly.

use anyhow::Result;
use screenrec::audio::AudioFile;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_fixture(dir: &Path, name: &str, spec: hound::WavSpec, frames: usize) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..frames * spec.channels as usize {
        writer.write_sample(((i * 37) % 20000) as i16 - 10000)?;
    }
    writer.finalize()?;
    Ok(path)
}

fn pcm16(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_fixture(temp_dir.path(), "sample.wav", pcm16(44100, 2), 22050)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.samples.len(), 44100);
    assert_eq!(audio.frame_count(), 22050);
    assert!((audio.duration_secs() - 0.5).abs() < 1e-9);
    assert_eq!(audio.path, path);

    Ok(())
}

#[test]
fn test_audio_file_preserves_samples() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_fixture(temp_dir.path(), "mono.wav", pcm16(16000, 1), 100)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.samples[0], -10000);
    assert_eq!(audio.samples[1], -10000 + 37);
    assert_eq!(audio.samples.len(), 100);

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_audio_file_rejects_float_samples() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("float.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    writer.write_sample(0.25f32)?;
    writer.finalize()?;

    let err = AudioFile::open(&path).err().expect("float WAV should be rejected");
    assert!(err.to_string().contains("Unsupported WAV format"));

    Ok(())
}
