//! Focal-length EXIF tagging for generated face JPEGs.
//!
//! The reconstruction tool infers camera intrinsics from
//! `FocalLengthIn35mmFilm`, so each face image carries the equivalent focal
//! length of its FOV.
//!
//! ## APP1 layout (big-endian TIFF)
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 6 | `"Exif\0\0"` |
//! | 6 | 8 | TIFF header `"MM"`, `0x002A`, IFD0 offset `8` |
//! | 14 | 18 | IFD0: one entry, `ExifIFDPointer` → 26 |
//! | 32 | 30 | Exif IFD: `FocalLength` (RATIONAL → 56), `FocalLengthIn35mmFilm` (SHORT) |
//! | 62 | 8 | FocalLength numerator/denominator |

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

use crate::ProjectionError;

const EXIF_IFD_POINTER: u16 = 0x8769;
const FOCAL_LENGTH: u16 = 0x920A;
const FOCAL_LENGTH_35MM: u16 = 0xA405;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

/// Diagonal of a 36×24 mm full-frame sensor.
const FULL_FRAME_DIAGONAL_MM: f64 = 43.266_615_305_567_87;

/// Equivalent focal lengths of a square face image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocalLength {
    /// Focal length in pixels: `(size / 2) / tan(fov / 2)`.
    pub pixels: f64,
    /// 35 mm-equivalent focal length via the image diagonal ratio.
    pub mm_35: f64,
}

impl FocalLength {
    /// Focal length for a square image of side `size` and the given FOV.
    #[must_use]
    pub fn for_square(fov_deg: f64, size: u32) -> Self {
        let size = size as f64;
        let pixels = (size / 2.0) / (fov_deg.to_radians() * 0.5).tan();
        let diag = (size * size * 2.0).sqrt();
        Self {
            pixels,
            mm_35: pixels * FULL_FRAME_DIAGONAL_MM / diag,
        }
    }
}

/// Build the APP1 payload (without marker and length) for a focal length.
fn exif_payload(focal: FocalLength) -> Vec<u8> {
    let mm_35 = focal.mm_35.round().clamp(0.0, u16::MAX as f64) as u16;
    let numerator = (focal.mm_35 * 100.0).round().clamp(0.0, u32::MAX as f64) as u32;

    let mut buf = Vec::with_capacity(70);
    buf.extend_from_slice(b"Exif\0\0");

    // TIFF header
    buf.extend_from_slice(b"MM");
    buf.extend_from_slice(&0x002Au16.to_be_bytes());
    buf.extend_from_slice(&8u32.to_be_bytes());

    // IFD0 at 8
    buf.extend_from_slice(&1u16.to_be_bytes());
    push_entry(&mut buf, EXIF_IFD_POINTER, TYPE_LONG, 1, 26u32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());

    // Exif IFD at 26, tags ascending
    buf.extend_from_slice(&2u16.to_be_bytes());
    push_entry(&mut buf, FOCAL_LENGTH, TYPE_RATIONAL, 1, 56u32.to_be_bytes());
    let mut short = [0u8; 4];
    short[..2].copy_from_slice(&mm_35.to_be_bytes());
    push_entry(&mut buf, FOCAL_LENGTH_35MM, TYPE_SHORT, 1, short);
    buf.extend_from_slice(&0u32.to_be_bytes());

    // Rational data at 56
    buf.extend_from_slice(&numerator.to_be_bytes());
    buf.extend_from_slice(&100u32.to_be_bytes());

    buf
}

fn push_entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&kind.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value);
}

/// Splice an APP1 segment into an encoded JPEG, after SOI and any JFIF APP0.
fn insert_app1(jpeg: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut insert_at = 2;
    if jpeg.len() >= 6 && jpeg[2] == 0xFF && jpeg[3] == 0xE0 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        insert_at = (4 + app0_len).min(jpeg.len());
    }

    let segment_len = (payload.len() + 2) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[insert_at..]);
    out
}

/// Encode a face image as JPEG with focal-length EXIF tags.
pub fn encode_face_jpeg(
    image: &RgbImage,
    quality: u8,
    focal: FocalLength,
) -> Result<Vec<u8>, ProjectionError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(ProjectionError::Encode)?;
    Ok(insert_app1(&jpeg, &exif_payload(focal)))
}

/// Read `FocalLengthIn35mmFilm` back from a JPEG produced by [`encode_face_jpeg`].
#[must_use]
pub fn read_focal_length_35mm(jpeg: &[u8]) -> Option<u16> {
    let start = jpeg.windows(6).position(|w| w == b"Exif\0\0")?;
    let tiff = jpeg.get(start + 6..)?;
    let be16 = |at: usize| tiff.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));
    let be32 = |at: usize| {
        tiff.get(at..at + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    };

    let ifd0 = be32(4)? as usize;
    let exif_ifd = (0..be16(ifd0)? as usize)
        .map(|i| ifd0 + 2 + i * 12)
        .find(|&entry| be16(entry) == Some(EXIF_IFD_POINTER))
        .and_then(|entry| be32(entry + 8))? as usize;

    (0..be16(exif_ifd)? as usize)
        .map(|i| exif_ifd + 2 + i * 12)
        .find(|&entry| be16(entry) == Some(FOCAL_LENGTH_35MM))
        .and_then(|entry| be16(entry + 8))
}
