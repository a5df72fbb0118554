//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) + BT.601 YUV→RGB |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Sharpening | `image::imageops::unsharpen` |
//! | EXIF | `kamadak-exif` via [`exif_reader`](super::exif_reader) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ResizeParams, ThumbnailParams};
use crate::metadata::RawExif;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Source extensions the scanner picks up, paired with the `image` decoder
/// that reads them.
///
/// AVIF is not listed: the `image` crate's `"avif"` feature only enables the
/// encoder, and `ImageFormat::reading_enabled()` still reports `true` for it.
/// AVIF sources go through [`decode_avif`] instead.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut exts: Vec<&'static str> = PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect();
    exts.push("avif");
    exts
});

/// Lower-case extensions of source photos this backend can read.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether a path has a supported photo extension (case-insensitive).
pub fn is_supported_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn failed(context: &str, path: &Path, err: impl std::fmt::Debug) -> BackendError {
    BackendError::ProcessingFailed(format!("{context} {}: {err:?}", path.display()))
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    if is_avif(path) {
        return decode_avif(path);
    }
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| failed("Failed to decode", path, e))
}

fn parse_avif(path: &Path) -> Result<avif_parse::AvifData, BackendError> {
    let bytes = std::fs::read(path)?;
    avif_parse::read_avif(&mut std::io::Cursor::new(&bytes))
        .map_err(|e| failed("Failed to parse AVIF", path, e))
}

/// Dimensions from the AVIF container header; no pixel decode.
fn identify_avif(path: &Path) -> Result<Dimensions, BackendError> {
    let avif = parse_avif(path)?;
    let meta = avif
        .primary_item_metadata()
        .map_err(|e| failed("Failed to read AVIF metadata", path, e))?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Decode an AVIF still with `rav1d` (pure Rust port of dav1d).
///
/// The decoder context and picture are released on every exit path.
fn decode_avif(path: &Path) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    let avif = parse_avif(path)?;
    let payload: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| BackendError::ProcessingFailed("rav1d settings alloc".into()))?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "rav1d open failed ({})",
            rc.0
        )));
    }

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), payload.len()) };
    if buf.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::ProcessingFailed(
            "rav1d data_create failed".into(),
        ));
    }
    unsafe { std::ptr::copy_nonoverlapping(payload.as_ptr(), buf, payload.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut data));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(BackendError::ProcessingFailed(format!(
            "rav1d send_data failed ({})",
            rc.0
        )));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::ProcessingFailed(format!(
            "rav1d get_picture failed ({})",
            rc.0
        )));
    }

    let layout = pic.p.layout;
    let subsampling = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some(None),
        DAV1D_PIXEL_LAYOUT_I420 => Some(Some((true, true))),
        DAV1D_PIXEL_LAYOUT_I422 => Some(Some((true, false))),
        DAV1D_PIXEL_LAYOUT_I444 => Some(Some((false, false))),
        _ => None,
    };
    let plane = |i: usize| pic.data[i].map(|p| p.as_ptr() as *const u8);

    let converted = match (subsampling, plane(0)) {
        (Some(chroma), Some(luma)) => {
            let frame = YuvFrame {
                luma,
                chroma: match chroma {
                    Some((ss_x, ss_y)) => plane(1).zip(plane(2)).map(|(u, v)| ChromaPlanes {
                        u,
                        v,
                        stride: pic.stride[1],
                        ss_x,
                        ss_y,
                    }),
                    None => None,
                },
                luma_stride: pic.stride[0],
                width: pic.p.w as u32,
                height: pic.p.h as u32,
                bpc: pic.p.bpc as u32,
            };
            if chroma.is_some() && frame.chroma.is_none() {
                Err(BackendError::ProcessingFailed(
                    "AVIF chroma planes missing".into(),
                ))
            } else {
                Ok((frame.width, frame.height, frame.to_rgb8()))
            }
        }
        (None, _) => Err(BackendError::ProcessingFailed(format!(
            "Unsupported AVIF pixel layout: {layout}"
        ))),
        (_, None) => Err(BackendError::ProcessingFailed(
            "AVIF luma plane missing".into(),
        )),
    };

    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }

    let (width, height, rgb) = converted?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| {
            BackendError::ProcessingFailed("Decoded AVIF buffer has the wrong size".into())
        })
}

struct ChromaPlanes {
    u: *const u8,
    v: *const u8,
    stride: isize,
    /// Horizontal / vertical subsampling (I420 = both).
    ss_x: bool,
    ss_y: bool,
}

/// Borrowed view of a decoded picture. `chroma` is `None` for monochrome.
struct YuvFrame {
    luma: *const u8,
    chroma: Option<ChromaPlanes>,
    luma_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
}

impl YuvFrame {
    /// Interleaved RGB8 using BT.601 coefficients.
    fn to_rgb8(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;
        let to_u8 = |v: f32| (v * scale).clamp(0.0, 255.0) as u8;

        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let y = sample(self.luma, self.luma_stride, col, row, self.bpc);
                match &self.chroma {
                    None => rgb.extend_from_slice(&[to_u8(y); 3]),
                    Some(c) => {
                        let cx = if c.ss_x { col / 2 } else { col };
                        let cy = if c.ss_y { row / 2 } else { row };
                        let cb = sample(c.u, c.stride, cx, cy, self.bpc) - center;
                        let cr = sample(c.v, c.stride, cx, cy, self.bpc) - center;
                        rgb.extend_from_slice(&[
                            to_u8(y + 1.402 * cr),
                            to_u8(y - 0.344136 * cb - 0.714136 * cr),
                            to_u8(y + 1.772 * cb),
                        ]);
                    }
                }
            }
        }
        rgb
    }
}

/// One sample from a plane; high bit depths are stored as `u16`.
#[inline]
fn sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { *(ptr.offset(byte_offset) as *const u16) }) as f32
    }
}

/// Encode and save as AVIF using rav1e (speed 6 for reasonable throughput).
fn save_avif(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let is_avif_target = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"));
    if !is_avif_target {
        return Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            path.display()
        )));
    }

    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality as u8);
    // Gallery renditions are opaque 8-bit; flattens 16-bit and alpha sources.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("AVIF encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if is_avif(path) {
            return identify_avif(path);
        }
        let (width, height) =
            image::image_dimensions(path).map_err(|e| failed("Failed to read dimensions", path, e))?;
        Ok(Dimensions { width, height })
    }

    fn read_exif(&self, path: &Path) -> Result<RawExif, BackendError> {
        super::exif_reader::read_exif(path)
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_avif(&resized, &params.output, params.quality.value())
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);

        let final_img = match params.sharpening {
            Some(s) => DynamicImage::from(image::imageops::unsharpen(&resized, s.sigma, s.threshold)),
            None => resized,
        };

        save_avif(&final_img, &params.output, params.quality.value())
    }
}
