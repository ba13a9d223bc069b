use std::future::Future;
use std::io::Cursor;

use anyhow::{bail, Result};
use image::{ImageFormat, RgbaImage};

/// One still image captured from a live feed.
///
/// RGBA8, row-major. Created per capture and discarded after the presence
/// check / transmission; never persisted.
#[derive(Debug, Clone)]
pub struct StillFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl StillFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            bail!(
                "frame buffer is {} bytes, expected {} for {}x{} RGBA",
                pixels.len(),
                expected,
                width,
                height
            );
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an encoded image (PNG, JPEG, ...) into an RGBA frame.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = (img.width(), img.height());
        Ok(Self {
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    /// Encode as PNG for transmission to the remote classifier.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let img = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| anyhow::anyhow!("frame buffer does not match dimensions"))?;
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        Ok(out)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Produces still frames from a live video feed on demand.
///
/// `None` means there is no active feed or the grab failed; the capture
/// pipeline treats that as a failed cycle, never as a crash.
pub trait FrameSource: Send + Sync {
    fn capture_frame(&self) -> impl Future<Output = Option<StillFrame>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(StillFrame::new(4, 4, vec![0u8; 10]).is_err());
        assert!(StillFrame::new(4, 4, vec![0u8; 64]).is_ok());
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let frame = StillFrame::new(8, 6, vec![128u8; 8 * 6 * 4]).unwrap();
        let png = frame.to_png().unwrap();
        let decoded = StillFrame::from_encoded(&png).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 6);
    }

    #[test]
    fn from_encoded_rejects_garbage() {
        assert!(StillFrame::from_encoded(b"not an image").is_err());
    }
}
