pub mod capture;
pub mod clock;
pub mod frame;
pub mod screen;
pub mod writer;

pub use capture::{VideoCapture, VideoStats};
pub use clock::FrameClock;
pub use frame::{BgrFrame, Frame};
pub use screen::ScreenSource;
pub use writer::{FfmpegAviWriter, VideoWriter, VideoWriterSettings};

#[cfg(feature = "capture")]
pub use screen::PrimaryScreen;
