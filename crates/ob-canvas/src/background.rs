//! Background image decoding.
//!
//! A background is a URL-like source (filesystem path or in-memory bytes)
//! decoded with the `image` crate and pre-scaled to the canvas size.
//! Load failures are non-fatal by contract: the caller logs and proceeds
//! with no background.

use image::RgbaImage;
use image::imageops::FilterType;
use ob_core::EngineError;
use std::path::PathBuf;

/// Where the background pixels come from.
#[derive(Debug, Clone)]
pub enum BackgroundSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl BackgroundSource {
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }
}

/// A decoded background, already scaled to the canvas.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pixels: RgbaImage,
}

impl BackgroundImage {
    /// Decode `source` and scale it to `width` x `height`.
    pub fn load(source: &BackgroundSource, width: u32, height: u32) -> Result<Self, EngineError> {
        let decoded = match source {
            BackgroundSource::Path(p) => image::open(p),
            BackgroundSource::Bytes(b) => image::load_from_memory(b),
        }
        .map_err(|e| EngineError::BackgroundLoad(e.to_string()))?;

        let pixels = decoded
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgba8();
        log::debug!("background loaded and scaled to {width}x{height}");
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel at canvas-local integer coordinates, packed 0RGB.
    /// Out-of-range coordinates sample as `None`.
    pub fn sample(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x as u32 >= self.pixels.width() || y as u32 >= self.pixels.height() {
            return None;
        }
        let p = self.pixels.get_pixel(x as u32, y as u32).0;
        Some(((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
    }
}
