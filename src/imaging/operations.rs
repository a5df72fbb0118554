//! Rendition operations: size the output from the source, then hand the
//! concrete parameters to a backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{RenditionSpec, ResizeParams, ThumbnailParams};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan a resize without executing it.
pub fn plan_rendition(
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    spec: &RenditionSpec,
) -> ResizeParams {
    let (width, height) = spec.output_dimensions(source_dims);
    ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality: spec.quality,
    }
}

/// Create a size-capped rendition and return its dimensions.
pub fn create_rendition(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    spec: &RenditionSpec,
) -> Result<(u32, u32)> {
    let params = plan_rendition(source, output, source_dims, spec);
    backend.resize(&params)?;
    Ok((params.width, params.height))
}

/// Create a thumbnail rendition and return its dimensions.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    spec: &RenditionSpec,
) -> Result<(u32, u32)> {
    let (width, height) = spec.output_dimensions(source_dims);
    backend.thumbnail(&ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality: spec.quality,
        sharpening: spec.sharpening,
    })?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(1920, 1080);
        let dims = get_dimensions(&backend, Path::new("/test.jpg")).unwrap();
        assert_eq!(dims, (1920, 1080));
    }

    #[test]
    fn plan_rendition_fits_box() {
        let params = plan_rendition(
            Path::new("/source.jpg"),
            Path::new("/out.avif"),
            (6000, 4000),
            &RenditionSpec::main(2400, 2400, 80),
        );
        assert_eq!((params.width, params.height), (2400, 1600));
        assert_eq!(params.quality.value(), 80);
    }

    #[test]
    fn create_rendition_small_source_not_upscaled() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        let dims = create_rendition(
            &backend,
            Path::new("/source.jpg"),
            &tmp.path().join("out.avif"),
            (640, 480),
            &RenditionSpec::main(2400, 2400, 80),
        )
        .unwrap();

        assert_eq!(dims, (640, 480));
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Resize {
                width: 640,
                height: 480,
                ..
            }
        ));
    }

    #[test]
    fn create_thumbnail_uses_smaller_box_and_sharpening() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        let dims = create_thumbnail(
            &backend,
            Path::new("/source.jpg"),
            &tmp.path().join("thumb.avif"),
            (3000, 2000),
            &RenditionSpec::thumbnail(600, 600, 60),
        )
        .unwrap();

        assert_eq!(dims, (600, 400));
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Thumbnail {
                quality: 60,
                sharpening: Some(_),
                ..
            }
        ));
    }
}
