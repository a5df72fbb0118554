//! EXIF metadata normalization.
//!
//! Raw EXIF values are turned into the six display strings shown in the
//! lightbox caption. Every formatter is total: a missing, zero, or otherwise
//! unusable input yields a fixed placeholder instead of an error.
//!
//! | Field | Source tag | Example | Placeholder |
//! |---|---|---|---|
//! | camera | Make + Model | `Canon EOS R5` | `Unknown Camera` |
//! | lens | LensModel | `RF24-70mm F2.8 L IS USM` | `Unknown Lens` |
//! | focal length | FocalLength | `35mm` | `Unknown` |
//! | aperture | FNumber | `f/2.8` | `Unknown` |
//! | shutter speed | ExposureTime | `1/250s`, `2s` | `Unknown` |
//! | iso | PhotographicSensitivity | `400` | `Unknown` |
//!
//! ## Rewrite tables
//!
//! Some cameras report names nobody wants to read (`SONY` / `ILCE-7M3`), and
//! phone lenses embed the full optical spec in the lens string. Two small
//! tables handle these: [`CameraAlias`] maps an exact make/model pair to a
//! friendly name, and [`LensRewrite`] truncates a lens description after a
//! marker. Both are configurable in `gallery.toml` under `[metadata]`.
//!
//! Extraction failure is handled by the caller: when the EXIF block cannot be
//! read at all, [`Metadata::default`] supplies all six placeholders at once.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_CAMERA: &str = "Unknown Camera";
pub const UNKNOWN_LENS: &str = "Unknown Lens";
pub const UNKNOWN: &str = "Unknown";

/// Normalized EXIF summary, one display string per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub camera: String,
    pub lens: String,
    pub focal_length: String,
    pub aperture: String,
    pub shutter_speed: String,
    pub iso: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            camera: UNKNOWN_CAMERA.to_string(),
            lens: UNKNOWN_LENS.to_string(),
            focal_length: UNKNOWN.to_string(),
            aperture: UNKNOWN.to_string(),
            shutter_speed: UNKNOWN.to_string(),
            iso: UNKNOWN.to_string(),
        }
    }
}

/// Raw EXIF fields as read from the file, before any formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExif {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<f64>,
    pub f_number: Option<f64>,
    pub exposure_time: Option<f64>,
    pub iso: Option<u32>,
}

/// Exact make/model pair mapped to a friendly camera name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraAlias {
    pub make: String,
    pub model: String,
    pub alias: String,
}

/// Lens descriptions containing `contains` are cut right after the first
/// occurrence of `keep_through`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LensRewrite {
    pub contains: String,
    pub keep_through: String,
}

/// Built-in camera aliases.
pub fn default_camera_aliases() -> Vec<CameraAlias> {
    [
        ("SONY", "ILCE-7M3", "Sony A7 III"),
        ("SONY", "ILCE-7M4", "Sony A7 IV"),
        ("SONY", "ILCE-6400", "Sony A6400"),
        ("NIKON CORPORATION", "NIKON Z 6_2", "Nikon Z6 II"),
        ("FUJIFILM", "X100V", "Fujifilm X100V"),
    ]
    .into_iter()
    .map(|(make, model, alias)| CameraAlias {
        make: make.to_string(),
        model: model.to_string(),
        alias: alias.to_string(),
    })
    .collect()
}

/// Built-in lens rewrites (phone lenses report focal length and aperture in
/// the lens string).
pub fn default_lens_rewrites() -> Vec<LensRewrite> {
    ["back triple camera", "back dual wide camera", "back dual camera", "back camera", "front camera"]
        .into_iter()
        .map(|marker| LensRewrite {
            contains: marker.to_string(),
            keep_through: marker.to_string(),
        })
        .collect()
}

/// Formatting rules applied on top of the raw EXIF values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    pub camera_aliases: Vec<CameraAlias>,
    pub lens_rewrites: Vec<LensRewrite>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            camera_aliases: default_camera_aliases(),
            lens_rewrites: default_lens_rewrites(),
        }
    }
}

/// Trimmed, non-empty string or `None`. EXIF ASCII fields are often padded.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Positive finite number or `None`.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl Normalizer {
    /// Normalize a full raw EXIF record.
    pub fn normalize(&self, raw: &RawExif) -> Metadata {
        Metadata {
            camera: self.camera(raw.make.as_deref(), raw.model.as_deref()),
            lens: self.lens(raw.lens.as_deref()),
            focal_length: focal_length(raw.focal_length),
            aperture: aperture(raw.f_number),
            shutter_speed: shutter_speed(raw.exposure_time),
            iso: iso(raw.iso),
        }
    }

    /// Camera display name from make and model.
    ///
    /// - neither → `Unknown Camera`
    /// - one of them → that one
    /// - both → alias table hit, else `make model` with a leading copy of the
    ///   make removed from the model (case-insensitive)
    pub fn camera(&self, make: Option<&str>, model: Option<&str>) -> String {
        match (present(make), present(model)) {
            (None, None) => UNKNOWN_CAMERA.to_string(),
            (Some(make), None) => make.to_string(),
            (None, Some(model)) => model.to_string(),
            (Some(make), Some(model)) => {
                if let Some(alias) = self
                    .camera_aliases
                    .iter()
                    .find(|a| a.make == make && a.model == model)
                {
                    return alias.alias.clone();
                }
                let trimmed_model = strip_prefix_ignore_case(model, make).trim_start();
                format!("{} {}", make, trimmed_model).trim().to_string()
            }
        }
    }

    /// Lens display name; known verbose patterns are truncated.
    pub fn lens(&self, raw: Option<&str>) -> String {
        let Some(lens) = present(raw) else {
            return UNKNOWN_LENS.to_string();
        };
        for rule in &self.lens_rewrites {
            if !lens.contains(&rule.contains) {
                continue;
            }
            if let Some(pos) = lens.find(&rule.keep_through) {
                return lens[..pos + rule.keep_through.len()].to_string();
            }
        }
        lens.to_string()
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> &'a str {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &value[prefix.len()..],
        _ => value,
    }
}

/// Focal length rounded to whole millimetres: `35mm`.
pub fn focal_length(mm: Option<f64>) -> String {
    match positive(mm) {
        Some(mm) => format!("{}mm", mm.round() as u64),
        None => UNKNOWN.to_string(),
    }
}

/// Aperture without rounding: `f/2.8`, `f/4`.
pub fn aperture(f_number: Option<f64>) -> String {
    match positive(f_number) {
        Some(f) => format!("f/{}", f),
        None => UNKNOWN.to_string(),
    }
}

/// Shutter speed: whole seconds as `2s`, fractions as `1/250s`.
pub fn shutter_speed(exposure_seconds: Option<f64>) -> String {
    match positive(exposure_seconds) {
        Some(t) if t >= 1.0 => format!("{}s", t),
        Some(t) => format!("1/{}s", (1.0 / t).round() as u64),
        None => UNKNOWN.to_string(),
    }
}

/// ISO sensitivity as a plain number.
pub fn iso(value: Option<u32>) -> String {
    match value {
        Some(v) if v > 0 => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
