//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions`, `avif-parse` for AVIF |
//! | **EXIF** | `kamadak-exif` |
//! | **Resize → AVIF** | Lanczos3 + rav1e encoder |
//! | **Thumbnail** | Lanczos3 + `unsharpen` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`RenditionSpec`] from config, concrete resize params
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub(crate) mod exif_reader;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{aspect_ratio_string, fit_within};
pub use operations::{create_rendition, create_thumbnail, get_dimensions};
pub use params::{Quality, RenditionSpec, ResizeParams, Sharpening, ThumbnailParams};
pub use rust_backend::{RustBackend, is_supported_photo, supported_input_extensions};
