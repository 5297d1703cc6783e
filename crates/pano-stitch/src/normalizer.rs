//! One shared flip-and-center transform over all face layers.

use glam::{DMat3, DVec3};
use pano_cubemap::{IMAGE_ROW_FLIP, quat_from_matrix};
use pano_ply::PointCloud;
use tracing::info;

use crate::layer::FaceLayer;
use crate::sampling::Sampler;
use crate::StitchError;

/// Default per-face cap on points used for the bounding box.
pub const DEFAULT_NORMALIZE_MAX_SAMPLES: usize = 200_000;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    const EMPTY: Aabb = Aabb {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    fn grow(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Bounding box of the finite points, `None` if there are none.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Option<Aabb> {
        let mut bbox = Aabb::EMPTY;
        for p in points.into_iter().filter(|p| p.is_finite()) {
            bbox.grow(*p);
        }
        (!bbox.is_empty()).then_some(bbox)
    }
}

/// Affine transform `p' = linear · p + translation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTransform {
    pub linear: DMat3,
    pub translation: DVec3,
}

impl SceneTransform {
    #[must_use]
    pub fn apply_point(&self, p: DVec3) -> DVec3 {
        self.linear * p + self.translation
    }

    /// Transform every position. Orientations are rotated by the linear part
    /// only when it is a proper rotation; otherwise they are left as they are.
    pub fn apply(&self, cloud: &mut PointCloud) {
        let rotation = (self.linear.determinant() > 0.0).then(|| quat_from_matrix(&self.linear));
        let (positions, rotations) = cloud.splats_mut();
        for p in positions.iter_mut() {
            *p = self.apply_point(*p);
        }
        if let (Some(r), Some(rotations)) = (rotation, rotations) {
            for q in rotations.iter_mut() {
                *q = r * *q;
            }
        }
    }
}

/// Result of a normalization pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizeReport {
    /// Bounding box of the sampled input positions.
    pub bbox: Aabb,
    /// Its center, which lands on the origin.
    pub center: DVec3,
    pub transform: SceneTransform,
}

impl NormalizeReport {
    /// Job-log line for the pass.
    #[must_use]
    pub fn log_line(&self) -> String {
        format!(
            "center={:.3},{:.3},{:.3}",
            self.center.x, self.center.y, self.center.z
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalNormalizer {
    max_samples: usize,
}

impl Default for GlobalNormalizer {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_NORMALIZE_MAX_SAMPLES,
        }
    }
}

impl GlobalNormalizer {
    pub fn new(max_samples: usize) -> Result<Self, StitchError> {
        if max_samples == 0 {
            return Err(StitchError::ZeroSampleCap);
        }
        Ok(Self { max_samples })
    }

    /// Bounding box over all layers, each subsampled to the cap.
    pub fn bounding_box(&self, layers: &[FaceLayer], sampler: &mut Sampler) -> Option<Aabb> {
        let mut sampled = Vec::new();
        for layer in layers {
            sampled.extend(sampler.subsample(layer.cloud.positions(), self.max_samples));
        }
        Aabb::from_points(&sampled)
    }

    /// Flip the image-row axis and move the bounding-box center to the origin,
    /// applying the same transform to every layer. Returns `None` without
    /// touching anything when no layer has a finite point.
    pub fn normalize(
        &self,
        layers: &mut [FaceLayer],
        sampler: &mut Sampler,
    ) -> Option<NormalizeReport> {
        let bbox = self.bounding_box(layers, sampler)?;
        let center = bbox.center();
        let transform = SceneTransform {
            linear: IMAGE_ROW_FLIP,
            translation: -(IMAGE_ROW_FLIP * center),
        };
        for layer in layers.iter_mut() {
            transform.apply(&mut layer.cloud);
        }
        let report = NormalizeReport {
            bbox,
            center,
            transform,
        };
        info!("Normalized {} layers, {}", layers.len(), report.log_line());
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use glam::DQuat;
    use pano_cubemap::{CubeFace, FaceTable};

    use super::*;

    const EPSILON: f64 = 1e-5;

    fn layer(face: CubeFace, positions: &[DVec3], rotations: Option<&[DQuat]>) -> FaceLayer {
        FaceLayer {
            spec: FaceTable::default().get(face).clone(),
            cloud: PointCloud::from_splats(positions, rotations).unwrap(),
            path: "unused.ply".into(),
        }
    }

    fn fixture() -> Vec<FaceLayer> {
        vec![
            layer(
                CubeFace::PosX,
                &[DVec3::new(4.0, 1.0, -2.0), DVec3::new(2.0, 3.0, 0.0)],
                None,
            ),
            layer(
                CubeFace::PosZ,
                &[DVec3::new(-1.0, 5.0, 6.0), DVec3::new(0.0, -1.0, 2.0)],
                None,
            ),
        ]
    }

    #[test]
    fn test_center_is_bbox_midpoint() {
        let layers = fixture();
        let bbox = GlobalNormalizer::default()
            .bounding_box(&layers, &mut Sampler::new(Some(1)))
            .unwrap();
        assert_eq!(bbox.min, DVec3::new(-1.0, -1.0, -2.0));
        assert_eq!(bbox.max, DVec3::new(4.0, 5.0, 6.0));
        assert_eq!(bbox.center(), DVec3::new(1.5, 2.0, 2.0));
    }

    #[test]
    fn test_normalized_union_is_centered_at_origin() {
        let mut layers = fixture();
        let report = GlobalNormalizer::default()
            .normalize(&mut layers, &mut Sampler::new(Some(1)))
            .unwrap();
        assert_eq!(report.center, DVec3::new(1.5, 2.0, 2.0));

        let all: Vec<DVec3> = layers
            .iter()
            .flat_map(|l| l.cloud.positions().iter().copied())
            .collect();
        let bbox = Aabb::from_points(&all).unwrap();
        assert!(bbox.center().length() < EPSILON, "{:?}", bbox.center());
        // Extents are unchanged by the flip.
        assert!((bbox.max - bbox.min - DVec3::new(5.0, 6.0, 8.0)).length() < EPSILON);
    }

    #[test]
    fn test_flip_negates_image_row_axis() {
        let mut layers = fixture();
        GlobalNormalizer::default().normalize(&mut layers, &mut Sampler::new(Some(1)));
        // (4, 1, -2) - (1.5, 2, 2) = (2.5, -1, -4), then y flipped.
        let p = layers[0].cloud.positions()[0];
        assert!((p - DVec3::new(2.5, 1.0, -4.0)).length() < EPSILON, "{p:?}");
    }

    #[test]
    fn test_reflection_leaves_orientations_unchanged() {
        let q = DQuat::from_axis_angle(DVec3::Y, 0.7);
        let mut layers = vec![layer(CubeFace::PosZ, &[DVec3::ONE, DVec3::ZERO], Some(&[q, q][..]))];
        let before = layers[0].cloud.rotations().unwrap().to_vec();
        GlobalNormalizer::default().normalize(&mut layers, &mut Sampler::new(Some(1)));
        assert_eq!(layers[0].cloud.rotations().unwrap(), before.as_slice());
    }

    #[test]
    fn test_proper_rotation_updates_orientations() {
        let turn = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);
        let transform = SceneTransform {
            linear: DMat3::from_quat(turn),
            translation: DVec3::ZERO,
        };
        let mut cloud = PointCloud::from_splats(&[DVec3::X], Some(&[DQuat::IDENTITY][..])).unwrap();
        transform.apply(&mut cloud);
        assert!((cloud.positions()[0] - DVec3::Y).length() < EPSILON);
        let q = cloud.rotations().unwrap()[0];
        assert!(q.abs_diff_eq(turn, EPSILON) || q.abs_diff_eq(-turn, EPSILON));
    }

    #[test]
    fn test_empty_layers_are_left_alone() {
        let mut layers = vec![layer(CubeFace::PosZ, &[], None)];
        assert!(
            GlobalNormalizer::default()
                .normalize(&mut layers, &mut Sampler::new(Some(1)))
                .is_none()
        );
    }

    #[test]
    fn test_non_finite_points_are_ignored() {
        let pts = [DVec3::new(f64::NAN, 0.0, 0.0), DVec3::ONE];
        let bbox = Aabb::from_points(&pts).unwrap();
        assert_eq!(bbox.min, DVec3::ONE);
        assert_eq!(bbox.max, DVec3::ONE);
    }
}
