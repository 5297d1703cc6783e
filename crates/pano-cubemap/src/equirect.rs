//! Equirectangular panoramas: validation, spherical mapping and bilinear sampling.
//!
//! Horizontal position maps to longitude (`atan2(x, z)`), vertical position to
//! latitude (`asin(y)`, +Y at the top row).

use std::f64::consts::PI;
use std::path::Path;

use glam::DVec3;
use image::{Rgb, RgbImage};

use crate::ProjectionError;

/// Allowed deviation of `width / height` from 2.0.
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// Check that a panorama is non-empty and roughly 2:1.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), ProjectionError> {
    if width == 0 || height == 0 {
        return Err(ProjectionError::InvalidDimensions { width, height });
    }
    let aspect = width as f64 / height as f64;
    if (aspect - 2.0).abs() > ASPECT_TOLERANCE {
        return Err(ProjectionError::AspectRatio { width, height });
    }
    Ok(())
}

/// Longitude/latitude in radians of a unit direction.
#[inline]
#[must_use]
pub fn direction_to_lon_lat(dir: DVec3) -> (f64, f64) {
    let lon = dir.x.atan2(dir.z);
    let lat = dir.y.clamp(-1.0, 1.0).asin();
    (lon, lat)
}

/// Continuous source pixel coordinate `(u, v)` for a longitude/latitude.
///
/// `u` is not wrapped and `v` is not clamped; [`EquirectImage::sample_bilinear`]
/// does both.
#[inline]
#[must_use]
pub fn lon_lat_to_pixel(lon: f64, lat: f64, width: u32, height: u32) -> (f64, f64) {
    let u = (lon / (2.0 * PI) + 0.5) * width as f64;
    let v = (0.5 - lat / PI) * height as f64;
    (u, v)
}

/// A validated, read-only equirectangular RGB panorama.
#[derive(Clone, Debug)]
pub struct EquirectImage {
    pixels: RgbImage,
}

impl EquirectImage {
    /// Load and validate a panorama from disk.
    pub fn open(path: &Path) -> Result<Self, ProjectionError> {
        if !path.exists() {
            return Err(ProjectionError::SourceMissing(path.to_path_buf()));
        }
        let pixels = image::open(path)
            .map_err(|source| ProjectionError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        Self::from_rgb(pixels)
    }

    /// Wrap an in-memory image after validating its dimensions.
    pub fn from_rgb(pixels: RgbImage) -> Result<Self, ProjectionError> {
        validate_dimensions(pixels.width(), pixels.height())?;
        Ok(Self { pixels })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Bilinearly sample at a continuous pixel coordinate.
    ///
    /// `u` wraps around the horizontal seam; `v` and its lower neighbor clamp
    /// at the poles. Channels are truncated to `u8`.
    #[must_use]
    pub fn sample_bilinear(&self, u: f64, v: f64) -> Rgb<u8> {
        let width = self.width();
        let height = self.height();

        let u = u.rem_euclid(width as f64);
        let v = v.clamp(0.0, (height - 1) as f64);

        // rem_euclid can land exactly on `width` after rounding
        let x0 = (u.floor() as u32) % width;
        let y0 = v.floor() as u32;
        let x1 = (x0 + 1) % width;
        let y1 = (y0 + 1).min(height - 1);

        let dx = u - u.floor();
        let dy = v - y0 as f64;

        let c00 = self.pixels.get_pixel(x0, y0).0;
        let c10 = self.pixels.get_pixel(x1, y0).0;
        let c01 = self.pixels.get_pixel(x0, y1).0;
        let c11 = self.pixels.get_pixel(x1, y1).0;

        let mut out = [0u8; 3];
        for (c, slot) in out.iter_mut().enumerate() {
            let top = c00[c] as f64 * (1.0 - dx) + c10[c] as f64 * dx;
            let bottom = c01[c] as f64 * (1.0 - dx) + c11[c] as f64 * dx;
            *slot = (top * (1.0 - dy) + bottom * dy) as u8;
        }
        Rgb(out)
    }

    /// Sample the panorama along a world-space direction.
    #[must_use]
    pub fn sample_direction(&self, dir: DVec3) -> Rgb<u8> {
        let (lon, lat) = direction_to_lon_lat(dir);
        let (u, v) = lon_lat_to_pixel(lon, lat, self.width(), self.height());
        self.sample_bilinear(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_validation() {
        assert!(validate_dimensions(4000, 2000).is_ok());
        assert!(validate_dimensions(4100, 2000).is_ok());
        assert!(matches!(
            validate_dimensions(4000, 1000),
            Err(ProjectionError::AspectRatio { .. })
        ));
        assert!(matches!(
            validate_dimensions(0, 0),
            Err(ProjectionError::InvalidDimensions { .. })
        ));
        assert!(validate_dimensions(4000, 1000).unwrap_err().is_validation());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EquirectImage::open(&dir.path().join("nope.360.jpg")).unwrap_err();
        assert!(matches!(err, ProjectionError::SourceMissing(_)));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_forward_maps_to_image_center() {
        let (lon, lat) = direction_to_lon_lat(DVec3::Z);
        let (u, v) = lon_lat_to_pixel(lon, lat, 400, 200);
        assert!((u - 200.0).abs() < 1e-9);
        assert!((v - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_up_maps_to_top_row() {
        let (lon, lat) = direction_to_lon_lat(DVec3::Y);
        let (_, v) = lon_lat_to_pixel(lon, lat, 400, 200);
        assert!(v.abs() < 1e-9);
    }

    #[test]
    fn test_plus_x_is_quarter_turn_right() {
        let (lon, lat) = direction_to_lon_lat(DVec3::X);
        let (u, _) = lon_lat_to_pixel(lon, lat, 400, 200);
        assert!((u - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_bilinear_wraps_horizontally() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 0, Rgb([200, 0, 0]));
        img.put_pixel(0, 0, Rgb([0, 0, 100]));
        let eq = EquirectImage::from_rgb(img).unwrap();
        // Halfway between the last and first column.
        let px = eq.sample_bilinear(3.5, 0.0);
        assert_eq!(px, Rgb([100, 0, 50]));
        // Negative u wraps to the right edge.
        assert_eq!(eq.sample_bilinear(-1.0, 0.0), Rgb([200, 0, 0]));
    }

    #[test]
    fn test_bilinear_clamps_vertically() {
        let mut img = RgbImage::new(4, 2);
        for x in 0..4 {
            img.put_pixel(x, 1, Rgb([10, 20, 30]));
        }
        let eq = EquirectImage::from_rgb(img).unwrap();
        assert_eq!(eq.sample_bilinear(1.0, 50.0), Rgb([10, 20, 30]));
        assert_eq!(eq.sample_bilinear(1.0, -5.0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_bilinear_interpolates_vertically() {
        let mut img = RgbImage::new(4, 2);
        for x in 0..4 {
            img.put_pixel(x, 0, Rgb([0, 0, 0]));
            img.put_pixel(x, 1, Rgb([100, 100, 100]));
        }
        let eq = EquirectImage::from_rgb(img).unwrap();
        assert_eq!(eq.sample_bilinear(2.0, 0.25), Rgb([25, 25, 25]));
    }
}
