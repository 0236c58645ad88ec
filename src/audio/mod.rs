pub mod backend;
pub mod chunker;
pub mod file;
pub mod replay;
pub mod writer;

#[cfg(feature = "capture")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use chunker::ChunkAssembler;
pub use file::AudioFile;
pub use replay::FileBackend;
pub use writer::{AudioStats, AudioWriter};

#[cfg(feature = "capture")]
pub use microphone::MicrophoneBackend;
