//! What a rendition should look like, independent of who draws it.
//!
//! [`RenditionSpec`] comes from config (bounding box, quality, sharpening)
//! and is turned into a concrete [`ResizeParams`] or [`ThumbnailParams`]
//! once the source dimensions are known. Backends only ever see the
//! concrete params.

use super::calculations::fit_within;
use std::path::PathBuf;

/// AVIF encoding quality, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Unsharp-mask settings applied after downscaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    /// Minimum brightness difference to sharpen; 0 sharpens everything.
    pub threshold: i32,
}

impl Sharpening {
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Bounding box and encoding settings for one kind of rendition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenditionSpec {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

impl RenditionSpec {
    /// Main rendition: no sharpening.
    pub fn main(max_width: u32, max_height: u32, quality: u32) -> Self {
        Self {
            max_width,
            max_height,
            quality: Quality::new(quality),
            sharpening: None,
        }
    }

    /// Thumbnail: light sharpening to survive the downscale.
    pub fn thumbnail(max_width: u32, max_height: u32, quality: u32) -> Self {
        Self {
            sharpening: Some(Sharpening::light()),
            ..Self::main(max_width, max_height, quality)
        }
    }

    /// Output size for a source of the given size. Never upscales.
    pub fn output_dimensions(&self, source: (u32, u32)) -> (u32, u32) {
        fit_within(source, (self.max_width, self.max_height))
    }

    /// Stable fingerprint of the encode settings, for content-based freshness.
    pub fn fingerprint(&self) -> String {
        let sharpening = self
            .sharpening
            .map(|s| format!("{}:{}", s.sigma, s.threshold))
            .unwrap_or_else(|| "none".to_string());
        format!(
            "avif:{}x{}:q{}:s{}",
            self.max_width,
            self.max_height,
            self.quality.value(),
            sharpening
        )
    }
}

/// A resize to exact dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// A resize to exact dimensions, optionally sharpened.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}
