//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `source` down to fit inside `bounds`, preserving aspect ratio.
///
/// Never upscales: a source already inside the box is returned unchanged.
/// Each output edge is at least 1 pixel.
///
/// # Examples
/// ```
/// # use folio_gallery::imaging::fit_within;
/// // 6000x4000 into a 2400 box → 2400x1600
/// assert_eq!(fit_within((6000, 4000), (2400, 2400)), (2400, 1600));
///
/// // Already small enough → unchanged
/// assert_eq!(fit_within((800, 600), (2400, 2400)), (800, 600));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 {
        return (src_w, src_h);
    }
    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Greatest common divisor (Euclid).
pub fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Aspect ratio as `"W:H"` reduced by the greatest common divisor.
///
/// `1600x1200` → `"4:3"`, `2400x1600` → `"3:2"`. Zero dimensions are
/// returned as-is (`"0:0"` has no meaningful reduction).
pub fn aspect_ratio_string(width: u32, height: u32) -> String {
    let divisor = gcd(width, height);
    if divisor == 0 {
        return format!("{}:{}", width, height);
    }
    format!("{}:{}", width / divisor, height / divisor)
}
