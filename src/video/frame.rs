use crate::error::{RecorderError, RecorderResult};

/// Screen snapshot as tightly packed RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> RecorderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RecorderError::ScreenCapture(format!(
                "RGBA buffer is {} bytes, expected {} for {}x{}",
                pixels.len(),
                expected,
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-colour frame
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to the encoder's input format, dropping alpha
    pub fn to_bgr(&self) -> BgrFrame {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.pixels.chunks_exact(4) {
            data.extend_from_slice(&[px[2], px[1], px[0]]);
        }

        BgrFrame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Packed BGR24 frame, the pixel format handed to the video writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl BgrFrame {
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}
