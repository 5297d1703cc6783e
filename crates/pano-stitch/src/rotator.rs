//! Camera-local → world transform of a single face cloud.

use pano_cubemap::FaceSpec;
use pano_ply::PointCloud;
use tracing::debug;

/// Moves a face cloud from the reconstruction tool's camera frame into the
/// shared world frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointCloudRotator;

impl PointCloudRotator {
    /// Rotate every position by the face basis and carry every orientation
    /// along with it. Point order and all other attributes are unchanged.
    pub fn apply(&self, spec: &FaceSpec, cloud: &mut PointCloud) {
        let basis = spec.basis;
        let (positions, rotations) = cloud.splats_mut();
        for p in positions.iter_mut() {
            *p = basis.to_world(*p);
        }
        if let Some(rotations) = rotations {
            for q in rotations.iter_mut() {
                *q = basis.transform_orientation(*q);
            }
        }
        debug!(
            "Rotated {} splats of face {} (reflection: {})",
            cloud.len(),
            spec.name(),
            basis.is_reflection()
        );
    }
}

#[cfg(test)]
mod tests {
    use glam::{DMat3, DQuat, DVec3};
    use pano_cubemap::{CubeFace, FaceTable};

    use super::*;

    const EPSILON: f64 = 1e-5;

    fn sample_positions() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.25, -0.5, 2.0),
            DVec3::new(-1.0, 0.75, 3.5),
        ]
    }

    #[test]
    fn test_center_ray_lands_on_face_forward() {
        let table = FaceTable::default();
        for face in CubeFace::ALL {
            let spec = table.get(face);
            let mut cloud = PointCloud::from_splats(&[DVec3::Z * 2.0], None).unwrap();
            PointCloudRotator.apply(spec, &mut cloud);
            let p = cloud.positions()[0];
            assert!((p - face.forward() * 2.0).length() < EPSILON, "{face}: {p:?}");
        }
    }

    #[test]
    fn test_transpose_restores_positions() {
        let table = FaceTable::default();
        let original = sample_positions();
        for spec in table.iter() {
            let mut cloud = PointCloud::from_splats(&original, None).unwrap();
            PointCloudRotator.apply(spec, &mut cloud);
            for (world, local) in cloud.positions().iter().zip(&original) {
                let back = spec.basis.to_local(*world);
                assert!((back - *local).length() < EPSILON, "{}", spec.name());
            }
        }
    }

    #[test]
    fn test_orientations_follow_basis() {
        let table = FaceTable::default();
        let q_local = DQuat::from_axis_angle(DVec3::new(0.3, 1.0, 0.2).normalize(), 1.1);
        let scales = DMat3::from_diagonal(DVec3::new(0.2, 0.05, 1.0));
        for spec in table.iter() {
            let mut cloud =
                PointCloud::from_splats(&sample_positions(), Some(&[q_local; 3][..])).unwrap();
            PointCloudRotator.apply(spec, &mut cloud);

            let b = spec.basis.matrix();
            let r_local = DMat3::from_quat(q_local);
            let expected = b * r_local * scales * r_local.transpose() * b.transpose();
            for q in cloud.rotations().unwrap() {
                assert!((q.length() - 1.0).abs() < EPSILON);
                let r = DMat3::from_quat(q.normalize());
                let actual = r * scales * r.transpose();
                assert!(actual.abs_diff_eq(expected, EPSILON), "{}", spec.name());
            }
        }
    }

    #[test]
    fn test_point_count_and_order_preserved() {
        let spec = FaceTable::default().get(CubeFace::NegX).clone();
        let original = sample_positions();
        let mut cloud = PointCloud::from_splats(&original, None).unwrap();
        PointCloudRotator.apply(&spec, &mut cloud);
        assert_eq!(cloud.len(), original.len());
        for (world, local) in cloud.positions().iter().zip(&original) {
            assert!((*world - spec.basis.to_world(*local)).length() < EPSILON);
        }
    }
}
