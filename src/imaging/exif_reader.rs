//! EXIF extraction via `kamadak-exif`.
//!
//! Reads the seven fields the caption needs from the primary IFD (the Exif
//! sub-IFD is merged into it by the reader):
//!
//! | Field | Tag | EXIF type |
//! |---|---|---|
//! | make | `0x010F` Make | ASCII |
//! | model | `0x0110` Model | ASCII |
//! | lens | `0xA434` LensModel | ASCII |
//! | focal length | `0x920A` FocalLength | RATIONAL |
//! | f-number | `0x829D` FNumber | RATIONAL |
//! | exposure | `0x829A` ExposureTime | RATIONAL |
//! | iso | `0x8827` PhotographicSensitivity | SHORT / LONG |
//!
//! A file without an EXIF block is not an error: it yields an empty
//! [`RawExif`]. A malformed block or an unreadable file is an error, which the
//! registry turns into the default metadata bundle.

use super::backend::BackendError;
use crate::metadata::RawExif;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn read_exif(path: &Path) -> Result<RawExif, BackendError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(RawExif::default()),
        Err(e) => {
            return Err(BackendError::ProcessingFailed(format!(
                "Failed to read EXIF from {}: {}",
                path.display(),
                e
            )));
        }
    };

    Ok(RawExif {
        make: ascii_field(&exif, Tag::Make),
        model: ascii_field(&exif, Tag::Model),
        lens: ascii_field(&exif, Tag::LensModel),
        focal_length: rational_field(&exif, Tag::FocalLength),
        f_number: rational_field(&exif, Tag::FNumber),
        exposure_time: rational_field(&exif, Tag::ExposureTime),
        iso: exif
            .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0)),
    })
}

/// First ASCII component, NUL-free and trimmed. `display_value` would quote it.
fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .find(|s| !s.is_empty()),
        _ => None,
    }
}

fn rational_field(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        Value::SRational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_helpers::create_test_jpeg;

    /// One IFD entry for [`build_tiff`].
    pub(crate) enum Entry {
        Ascii(u16, &'static str),
        Short(u16, u16),
        Rational(u16, u32, u32),
    }

    impl Entry {
        fn tag(&self) -> u16 {
            match self {
                Entry::Ascii(t, _) | Entry::Short(t, _) | Entry::Rational(t, _, _) => *t,
            }
        }
    }

    /// Build a big-endian TIFF block with IFD0 entries and an Exif sub-IFD.
    fn build_tiff(ifd0: &[Entry], exif_ifd: &[Entry]) -> Vec<u8> {
        const EXIF_POINTER: u16 = 0x8769;
        let ifd_len = |n: usize| 2 + n * 12 + 4;

        let ifd0_count = ifd0.len() + 1;
        let ifd0_offset = 8usize;
        let exif_offset = ifd0_offset + ifd_len(ifd0_count);
        let mut data_offset = exif_offset + ifd_len(exif_ifd.len());

        let mut data = Vec::new();
        let mut encode_ifd = |entries: Vec<(&Entry, Option<u32>)>, data: &mut Vec<u8>| {
            let mut out = Vec::new();
            out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
            for (entry, pointer) in entries {
                out.extend_from_slice(&entry.tag().to_be_bytes());
                match (entry, pointer) {
                    (_, Some(ptr)) => {
                        out.extend_from_slice(&4u16.to_be_bytes());
                        out.extend_from_slice(&1u32.to_be_bytes());
                        out.extend_from_slice(&ptr.to_be_bytes());
                    }
                    (Entry::Ascii(_, s), None) => {
                        let mut bytes = s.as_bytes().to_vec();
                        bytes.push(0);
                        out.extend_from_slice(&2u16.to_be_bytes());
                        out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                        out.extend_from_slice(&(data_offset as u32).to_be_bytes());
                        data_offset += bytes.len();
                        data.extend_from_slice(&bytes);
                    }
                    (Entry::Short(_, v), None) => {
                        out.extend_from_slice(&3u16.to_be_bytes());
                        out.extend_from_slice(&1u32.to_be_bytes());
                        out.extend_from_slice(&v.to_be_bytes());
                        out.extend_from_slice(&[0, 0]);
                    }
                    (Entry::Rational(_, num, den), None) => {
                        out.extend_from_slice(&5u16.to_be_bytes());
                        out.extend_from_slice(&1u32.to_be_bytes());
                        out.extend_from_slice(&(data_offset as u32).to_be_bytes());
                        data_offset += 8;
                        data.extend_from_slice(&num.to_be_bytes());
                        data.extend_from_slice(&den.to_be_bytes());
                    }
                }
            }
            out.extend_from_slice(&0u32.to_be_bytes());
            out
        };

        let pointer_entry = Entry::Short(EXIF_POINTER, 0);
        let mut first: Vec<(&Entry, Option<u32>)> = ifd0.iter().map(|e| (e, None)).collect();
        first.push((&pointer_entry, Some(exif_offset as u32)));
        first.sort_by_key(|(e, _)| e.tag());
        let ifd0_bytes = encode_ifd(first, &mut data);

        let mut second: Vec<(&Entry, Option<u32>)> = exif_ifd.iter().map(|e| (e, None)).collect();
        second.sort_by_key(|(e, _)| e.tag());
        let exif_bytes = encode_ifd(second, &mut data);

        let mut tiff = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        tiff.extend(ifd0_bytes);
        tiff.extend(exif_bytes);
        tiff.extend(data);
        tiff
    }

    /// Splice an APP1 EXIF segment right after the SOI marker of a JPEG.
    pub(crate) fn inject_exif(path: &Path, ifd0: &[Entry], exif_ifd: &[Entry]) {
        let jpeg = std::fs::read(path).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend(build_tiff(ifd0, exif_ifd));

        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend(payload);
        out.extend_from_slice(&jpeg[2..]);
        std::fs::write(path, out).unwrap();
    }

    /// Write a small JPEG carrying Canon EOS R5 / ISO 100 EXIF.
    pub(crate) fn create_canon_jpeg(path: &Path) {
        create_test_jpeg(path, 60, 40);
        inject_exif(
            path,
            &[Entry::Ascii(0x010F, "Canon"), Entry::Ascii(0x0110, "EOS R5")],
            &[
                Entry::Rational(0x829A, 1, 250),
                Entry::Rational(0x829D, 28, 10),
                Entry::Short(0x8827, 100),
            ],
        );
    }

    #[test]
    fn reads_ascii_rational_and_short_fields() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("canon.jpg");
        create_canon_jpeg(&path);

        let raw = read_exif(&path).unwrap();
        assert_eq!(raw.make.as_deref(), Some("Canon"));
        assert_eq!(raw.model.as_deref(), Some("EOS R5"));
        assert_eq!(raw.iso, Some(100));
        assert_eq!(raw.exposure_time, Some(0.004));
        assert_eq!(raw.f_number, Some(2.8));
        assert_eq!(raw.lens, None);
        assert_eq!(raw.focal_length, None);
    }

    #[test]
    fn jpeg_without_exif_is_empty_not_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.jpg");
        create_test_jpeg(&path, 20, 20);

        assert_eq!(read_exif(&path).unwrap(), RawExif::default());
    }

    #[test]
    fn missing_file_is_error() {
        assert!(read_exif(Path::new("/nonexistent/photo.jpg")).is_err());
    }

    #[test]
    fn garbage_file_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(read_exif(&path).is_err());
    }

    #[test]
    fn zero_denominator_rational_is_absent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("zero.jpg");
        create_test_jpeg(&path, 20, 20);
        inject_exif(&path, &[], &[Entry::Rational(0x920A, 35, 0)]);

        assert_eq!(read_exif(&path).unwrap().focal_length, None);
    }
}
