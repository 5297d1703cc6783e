//! The immutable face orientation table passed to every pipeline stage.

use std::path::PathBuf;

use crate::{CubeFace, FaceBasis};

/// Default per-face field of view, wider than 90° so neighbors overlap.
pub const DEFAULT_OVERSCAN_FOV_DEG: f64 = 105.0;

/// Smallest field of view the projector accepts.
pub const MIN_OVERSCAN_FOV_DEG: f64 = 100.0;

/// Largest field of view the projector accepts.
pub const MAX_OVERSCAN_FOV_DEG: f64 = 110.0;

/// Clamp a requested overscan FOV into \[100, 110\] degrees.
///
/// NaN falls back to the default.
#[must_use]
pub fn clamp_fov(requested_deg: f64) -> f64 {
    if requested_deg.is_nan() {
        return DEFAULT_OVERSCAN_FOV_DEG;
    }
    requested_deg.clamp(MIN_OVERSCAN_FOV_DEG, MAX_OVERSCAN_FOV_DEG)
}

/// One face of the table: identity, nominal angles, FOV and camera basis.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceSpec {
    pub face: CubeFace,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    /// Field of view in degrees, horizontal = vertical.
    pub fov_deg: f64,
    pub basis: FaceBasis,
}

impl FaceSpec {
    fn new(face: CubeFace, fov_deg: f64) -> Self {
        let (yaw_deg, pitch_deg, roll_deg) = face.angles_deg();
        Self {
            face,
            yaw_deg,
            pitch_deg,
            roll_deg,
            fov_deg,
            basis: FaceBasis::of(face),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.face.index()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.face.name()
    }

    /// `tan(fov / 2)`, the half-extent of the image plane at unit depth.
    #[must_use]
    pub fn tan_half_fov(&self) -> f64 {
        (self.fov_deg.to_radians() * 0.5).tan()
    }

    /// `cos(fov / 2)`, the view-cone threshold on `dir · forward`.
    #[must_use]
    pub fn cos_half_fov(&self) -> f64 {
        (self.fov_deg.to_radians() * 0.5).cos()
    }
}

/// The six face specs in fixed index order.
///
/// Built once per job with the clamped overscan FOV and shared read-only by
/// the projector, rotator, aligner and coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceTable {
    faces: [FaceSpec; 6],
}

impl FaceTable {
    /// Build the table for a requested FOV, clamped to \[100, 110\].
    #[must_use]
    pub fn new(requested_fov_deg: f64) -> Self {
        let fov = clamp_fov(requested_fov_deg);
        Self {
            faces: CubeFace::ALL.map(|face| FaceSpec::new(face, fov)),
        }
    }

    /// The clamped FOV shared by all faces.
    #[must_use]
    pub fn fov_deg(&self) -> f64 {
        self.faces[0].fov_deg
    }

    #[must_use]
    pub fn get(&self, face: CubeFace) -> &FaceSpec {
        &self.faces[face.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaceSpec> {
        self.faces.iter()
    }
}

impl Default for FaceTable {
    fn default() -> Self {
        Self::new(DEFAULT_OVERSCAN_FOV_DEG)
    }
}

/// A face spec paired with the perspective image rendered for it.
#[derive(Clone, Debug, PartialEq)]
pub struct CubeFaceExtraction {
    pub spec: FaceSpec,
    pub image_path: PathBuf,
}
