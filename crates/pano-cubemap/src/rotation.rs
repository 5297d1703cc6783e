//! Face bases and the matrix/quaternion conventions shared by every pipeline stage.
//!
//! Quaternions are glam's `DQuat` (Hamilton product, right-handed rotation of
//! column vectors). Point-cloud files store them as `w, x, y, z`.
//!
//! A face basis maps camera-local coordinates to world coordinates:
//! `world = x * right + y * up + z * forward`. Four of the six bases carry a
//! reflection (determinant −1) because the camera frame's `y` axis runs down
//! the image. Such a basis is split into a proper rotation `R` and the fixed
//! image-row flip `F = diag(1, −1, 1)` so that `B = R * F`.

use glam::{DMat3, DQuat, DVec3};

use crate::CubeFace;

/// Sign flip of the camera's image-row axis.
pub const IMAGE_ROW_FLIP: DMat3 = DMat3::from_cols(DVec3::X, DVec3::NEG_Y, DVec3::Z);

/// Orthonormal camera basis of one face, expressed in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBasis {
    /// World direction of increasing image column.
    pub right: DVec3,
    /// World direction of increasing image row.
    pub up: DVec3,
    /// Viewing direction.
    pub forward: DVec3,
}

impl FaceBasis {
    /// The fixed basis of a face.
    #[must_use]
    pub fn of(face: CubeFace) -> Self {
        Self {
            right: face.right(),
            up: face.up(),
            forward: face.forward(),
        }
    }

    /// Camera-local → world matrix (columns `right, up, forward`).
    #[must_use]
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_cols(self.right, self.up, self.forward)
    }

    /// `+1` for a proper rotation, `−1` when the basis includes a reflection.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.matrix().determinant()
    }

    /// True if the basis includes a reflection.
    #[must_use]
    pub fn is_reflection(&self) -> bool {
        self.determinant() < 0.0
    }

    /// Rotation part `R` of the basis, with `matrix() == R * F` for reflecting
    /// bases and `matrix() == R` otherwise.
    #[must_use]
    pub fn proper_rotation(&self) -> DMat3 {
        if self.is_reflection() {
            self.matrix() * IMAGE_ROW_FLIP
        } else {
            self.matrix()
        }
    }

    /// Quaternion of [`proper_rotation`](Self::proper_rotation).
    #[must_use]
    pub fn quat(&self) -> DQuat {
        quat_from_matrix(&self.proper_rotation())
    }

    /// Map a camera-local point into world space.
    #[inline]
    #[must_use]
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.right * local.x + self.up * local.y + self.forward * local.z
    }

    /// Map a world point back into the camera-local frame (transpose).
    #[inline]
    #[must_use]
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        DVec3::new(
            world.dot(self.right),
            world.dot(self.up),
            world.dot(self.forward),
        )
    }

    /// Carry a camera-local splat orientation into world space.
    ///
    /// For a splat with covariance `Q S Qᵀ`, the world covariance is
    /// `B Q S Qᵀ Bᵀ`. With `B = R F` and diagonal `S`, that equals
    /// `(R · F Q F) S (R · F Q F)ᵀ`, so the new orientation is `R · (F Q F)`.
    /// The quaternion norm is preserved.
    #[must_use]
    pub fn transform_orientation(&self, q: DQuat) -> DQuat {
        let local = if self.is_reflection() {
            conjugate_by_axis_signs(q, DVec3::new(1.0, -1.0, 1.0))
        } else {
            q
        };
        self.quat() * local
    }
}

/// Rotation matrix → unit quaternion.
#[must_use]
pub fn quat_from_matrix(m: &DMat3) -> DQuat {
    DQuat::from_mat3(m)
}

/// Quaternion → rotation matrix. Non-unit input is normalized first.
#[must_use]
pub fn matrix_from_quat(q: DQuat) -> DMat3 {
    let len = q.length();
    if len == 0.0 {
        return DMat3::IDENTITY;
    }
    DMat3::from_quat(q / len)
}

/// Conjugate a rotation by the diagonal sign matrix `M = diag(signs)`,
/// returning the quaternion of `M Q M`.
///
/// The rotation axis maps to `det(M) · M a`; the angle is unchanged.
#[must_use]
pub fn conjugate_by_axis_signs(q: DQuat, signs: DVec3) -> DQuat {
    let det = signs.x * signs.y * signs.z;
    let v = DVec3::new(q.x, q.y, q.z) * signs * det;
    DQuat::from_xyzw(v.x, v.y, v.z, q.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_mat_close(a: DMat3, b: DMat3, ctx: &str) {
        assert!(
            a.abs_diff_eq(b, EPSILON),
            "{ctx}: matrices differ\n{a:?}\n{b:?}"
        );
    }

    #[test]
    fn test_basis_matrices_are_orthonormal() {
        for face in CubeFace::ALL {
            let m = FaceBasis::of(face).matrix();
            assert_mat_close(m.transpose() * m, DMat3::IDENTITY, face.name());
            assert!((m.determinant().abs() - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_reflection_split_reconstructs_basis() {
        for face in CubeFace::ALL {
            let basis = FaceBasis::of(face);
            let r = basis.proper_rotation();
            assert!((r.determinant() - 1.0).abs() < EPSILON, "{face} R not proper");
            let rebuilt = if basis.is_reflection() {
                r * IMAGE_ROW_FLIP
            } else {
                r
            };
            assert_mat_close(rebuilt, basis.matrix(), face.name());
        }
    }

    #[test]
    fn test_matrix_quat_matrix_roundtrip_for_all_faces() {
        for face in CubeFace::ALL {
            let r = FaceBasis::of(face).proper_rotation();
            let q = quat_from_matrix(&r);
            assert!((q.length() - 1.0).abs() < EPSILON);
            assert_mat_close(matrix_from_quat(q), r, face.name());
        }
    }

    #[test]
    fn test_to_local_inverts_to_world() {
        let p = DVec3::new(0.3, -1.7, 2.25);
        for face in CubeFace::ALL {
            let basis = FaceBasis::of(face);
            let back = basis.to_local(basis.to_world(p));
            assert!((back - p).length() < EPSILON, "{face}: {back:?}");
            assert!((basis.to_world(p) - basis.matrix() * p).length() < EPSILON);
        }
    }

    #[test]
    fn test_orientation_matches_covariance_transform() {
        let q_local = DQuat::from_axis_angle(DVec3::new(1.0, 2.0, -0.5).normalize(), 0.8);
        let scales = DMat3::from_diagonal(DVec3::new(0.1, 0.4, 2.0));
        let r_local = DMat3::from_quat(q_local);
        let cov_local = r_local * scales * r_local.transpose();

        for face in CubeFace::ALL {
            let basis = FaceBasis::of(face);
            let b = basis.matrix();
            let expected = b * cov_local * b.transpose();

            let q_world = basis.transform_orientation(q_local);
            let r_world = DMat3::from_quat(q_world);
            let actual = r_world * scales * r_world.transpose();
            assert_mat_close(actual, expected, face.name());
        }
    }

    #[test]
    fn test_transform_orientation_preserves_norm() {
        let q = DQuat::from_xyzw(0.2, -0.4, 0.1, 1.5);
        for face in CubeFace::ALL {
            let out = FaceBasis::of(face).transform_orientation(q);
            assert!((out.length() - q.length()).abs() < EPSILON);
        }
    }

    #[test]
    fn test_conjugate_by_identity_signs_is_noop() {
        let q = DQuat::from_axis_angle(DVec3::Y, 0.3);
        let out = conjugate_by_axis_signs(q, DVec3::ONE);
        assert!((out - q).length() < EPSILON);
    }
}
