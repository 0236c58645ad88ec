// Microphone backend built on cpal
//
// cpal streams are not Send on every platform, so each capture owns a
// dedicated thread that builds the stream, parks until stopped, and drops
// the stream on the same thread.

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::chunker::{f32_to_i16, u16_to_i16, ChunkAssembler};
use crate::error::{RecorderError, RecorderResult};

/// Microphone capture through the platform's default audio host
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    device_name: Option<String>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig, device_name: Option<String>) -> Self {
        Self {
            config,
            device_name,
            stop_tx: None,
            thread: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> RecorderResult<mpsc::Receiver<AudioFrame>> {
        if self.thread.is_some() {
            return Err(RecorderError::AudioDeviceOpen("Already capturing".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let config = self.config.clone();
        let device_name = self.device_name.clone();
        let dropped = Arc::clone(&self.dropped);

        let thread = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || capture_thread(config, device_name, tx, dropped, ready_tx, stop_rx))
            .map_err(|e| RecorderError::AudioDeviceOpen(format!("Failed to spawn capture thread: {}", e)))?;

        let ready = ready_rx
            .await
            .unwrap_or_else(|_| Err(anyhow!("Capture thread exited before the stream started")));

        if let Err(e) = ready {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
            return Err(RecorderError::AudioDeviceOpen(format!("{:#}", e)));
        }

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        Ok(rx)
    }

    async fn stop(&mut self) -> RecorderResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {}
            _ => error!("Microphone capture thread panicked"),
        }

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!("Microphone capture dropped {} chunks (writer too slow)", dropped);
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn dropped_chunks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

fn capture_thread(
    config: AudioBackendConfig,
    device_name: Option<String>,
    tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
    ready_tx: oneshot::Sender<anyhow::Result<()>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let opened = open_stream(&config, device_name.as_deref(), tx.clone(), Arc::clone(&dropped));

    let (stream, assembler) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    // Returns on stop() or when the backend is dropped
    let _ = stop_rx.recv();
    drop(stream);

    let tail = assembler.lock().ok().and_then(|mut a| a.flush());
    if let Some(tail) = tail {
        if tx.try_send(tail).is_err() {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    info!("Microphone capture stopped");
}

fn open_stream(
    config: &AudioBackendConfig,
    device_name: Option<&str>,
    tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
) -> anyhow::Result<(cpal::Stream, Arc<Mutex<ChunkAssembler>>)> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("Microphone '{}' not found", name))?,
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?,
    };

    info!(
        "Microphone device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = choose_config(&device, config.sample_rate, config.channels)?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    if stream_config.sample_rate.0 != config.sample_rate || stream_config.channels != config.channels {
        warn!(
            "Requested {}Hz/{}ch not supported, recording {}Hz/{}ch",
            config.sample_rate, config.channels, stream_config.sample_rate.0, stream_config.channels
        );
    } else {
        info!(
            "Audio format: {}Hz, {} channels, {:?}",
            stream_config.sample_rate.0, stream_config.channels, sample_format
        );
    }

    let assembler = Arc::new(Mutex::new(ChunkAssembler::new(
        stream_config.sample_rate.0,
        stream_config.channels,
        config.chunk_frames,
    )));

    let sink = ChunkSink {
        assembler: Arc::clone(&assembler),
        tx,
        dropped,
    };
    let err_fn = |err: cpal::StreamError| error!("Microphone stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                sink.deliver(&samples);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| sink.deliver(data),
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| u16_to_i16(s)).collect();
                sink.deliver(&samples);
            },
            err_fn,
            None,
        ),
        other => anyhow::bail!("Unsupported sample format {:?}", other),
    }
    .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    Ok((stream, assembler))
}

/// Prefer an exact match for the requested format, else the device default
fn choose_config(
    device: &cpal::Device,
    sample_rate: u32,
    channels: u16,
) -> anyhow::Result<cpal::SupportedStreamConfig> {
    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            if range.channels() == channels
                && range.min_sample_rate().0 <= sample_rate
                && range.max_sample_rate().0 >= sample_rate
            {
                return Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)));
            }
        }
    }

    device
        .default_input_config()
        .context("Failed to query default input config")
}

/// Callback-side end of the bounded chunk channel
struct ChunkSink {
    assembler: Arc<Mutex<ChunkAssembler>>,
    tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
}

impl ChunkSink {
    fn deliver(&self, samples: &[i16]) {
        let chunks = match self.assembler.lock() {
            Ok(mut assembler) => assembler.push(samples),
            Err(_) => return,
        };

        for chunk in chunks {
            match self.tx.try_send(chunk) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if total == 1 || total % 100 == 0 {
                        warn!("Audio queue full, {} chunks dropped so far", total);
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    }
}
