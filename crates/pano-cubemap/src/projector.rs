//! Equirectangular → perspective cube face rendering.

use std::path::{Path, PathBuf};

use glam::DVec3;
use image::RgbImage;
use tracing::{debug, info};

use crate::exif::{FocalLength, encode_face_jpeg};
use crate::{CubeFaceExtraction, EquirectImage, FaceSpec, FaceTable, ProjectionError};

/// Default JPEG quality of generated face images.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// File name of the rendered image for a face index.
#[must_use]
pub fn face_image_name(index: usize) -> String {
    format!("face_{index}.jpg")
}

/// Normalized device coordinate of a pixel center along one axis, in \[-1, 1\].
#[inline]
#[must_use]
pub fn pixel_to_ndc(pixel: u32, size: u32) -> f64 {
    (pixel as f64 + 0.5) / size as f64 * 2.0 - 1.0
}

/// Unit world-space ray through pixel `(px, py)` of a square face of side `size`.
#[inline]
#[must_use]
pub fn ray_direction(spec: &FaceSpec, px: u32, py: u32, size: u32) -> DVec3 {
    let tan_half = spec.tan_half_fov();
    let gx = pixel_to_ndc(px, size) * tan_half;
    let gy = pixel_to_ndc(py, size) * tan_half;
    let dir = spec.basis.forward + spec.basis.right * gx + spec.basis.up * gy;
    dir / dir.length().max(1e-8)
}

/// Renders the six perspective views of a panorama.
#[derive(Clone, Debug)]
pub struct CubeProjector {
    table: FaceTable,
    jpeg_quality: u8,
}

impl CubeProjector {
    #[must_use]
    pub fn new(table: FaceTable) -> Self {
        Self {
            table,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn table(&self) -> &FaceTable {
        &self.table
    }

    /// Render one face as a `size × size` image.
    #[must_use]
    pub fn render_face(&self, source: &EquirectImage, spec: &FaceSpec, size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |px, py| {
            source.sample_direction(ray_direction(spec, px, py, size))
        })
    }

    /// Render and write all six faces as `face_{index}.jpg` under `workdir`.
    ///
    /// The face side equals the panorama height. Returns the extractions in
    /// face index order.
    pub fn extract(
        &self,
        source: &EquirectImage,
        workdir: &Path,
    ) -> Result<Vec<CubeFaceExtraction>, ProjectionError> {
        let size = source.height();
        let focal = FocalLength::for_square(self.table.fov_deg(), size);
        info!(
            "Projecting {}x{} panorama to six {size}px faces (fov={:.1}, f35={:.1}mm)",
            source.width(),
            source.height(),
            self.table.fov_deg(),
            focal.mm_35
        );

        let mut extractions = Vec::with_capacity(6);
        for spec in self.table.iter() {
            let image_path = workdir.join(face_image_name(spec.index()));
            let face_img = self.render_face(source, spec, size);
            self.write_face(&image_path, &face_img, focal)?;
            debug!(face = spec.name(), path = %image_path.display(), "face rendered");
            extractions.push(CubeFaceExtraction {
                spec: spec.clone(),
                image_path,
            });
        }
        Ok(extractions)
    }

    /// Load and validate `source`, then [`extract`](Self::extract).
    pub fn extract_from_path(
        &self,
        source: &Path,
        workdir: &Path,
    ) -> Result<Vec<CubeFaceExtraction>, ProjectionError> {
        let image = EquirectImage::open(source)?;
        self.extract(&image, workdir)
    }

    fn write_face(
        &self,
        path: &Path,
        image: &RgbImage,
        focal: FocalLength,
    ) -> Result<(), ProjectionError> {
        let bytes = encode_face_jpeg(image, self.jpeg_quality, focal)?;
        std::fs::write(path, bytes).map_err(|source| ProjectionError::Write {
            path: PathBuf::from(path),
            source,
        })
    }
}
