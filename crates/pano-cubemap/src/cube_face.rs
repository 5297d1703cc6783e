//! The six cube faces a panorama is split into and their camera bases.

use glam::DVec3;

/// The six perspective views that tile the sphere.
///
/// Each variant corresponds to a view whose forward axis points along the
/// named world axis. The discriminant is the fixed face index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

impl CubeFace {
    /// All six faces in canonical index order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Fixed face index (0–5).
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face for an index, if in range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<CubeFace> {
        Self::ALL.get(index).copied()
    }

    /// Short axis name, e.g. `"+X"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CubeFace::PosX => "+X",
            CubeFace::NegX => "-X",
            CubeFace::PosY => "+Y",
            CubeFace::NegY => "-Y",
            CubeFace::PosZ => "+Z",
            CubeFace::NegZ => "-Z",
        }
    }

    /// Nominal view angles `(yaw, pitch, roll)` in degrees.
    #[must_use]
    pub fn angles_deg(self) -> (f64, f64, f64) {
        match self {
            CubeFace::PosX => (90.0, 0.0, 0.0),
            CubeFace::NegX => (-90.0, 0.0, 0.0),
            CubeFace::PosY => (0.0, -90.0, 0.0),
            CubeFace::NegY => (0.0, 90.0, 0.0),
            CubeFace::PosZ => (0.0, 0.0, 0.0),
            CubeFace::NegZ => (180.0, 0.0, 0.0),
        }
    }

    /// View direction: the world axis this face looks along.
    #[must_use]
    pub fn forward(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// World direction of increasing image column.
    #[must_use]
    pub fn right(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::NEG_Z,
            CubeFace::NegX => DVec3::Z,
            CubeFace::PosY => DVec3::X,
            CubeFace::NegY => DVec3::X,
            CubeFace::PosZ => DVec3::X,
            CubeFace::NegZ => DVec3::NEG_X,
        }
    }

    /// World direction of increasing image row.
    ///
    /// The reconstruction tool's camera frame has `y` pointing down the
    /// image, so this is the camera's `y` axis expressed in world space.
    #[must_use]
    pub fn up(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::NEG_Y,
            CubeFace::NegX => DVec3::NEG_Y,
            CubeFace::PosY => DVec3::NEG_Z,
            CubeFace::NegY => DVec3::Z,
            CubeFace::PosZ => DVec3::NEG_Y,
            CubeFace::NegZ => DVec3::NEG_Y,
        }
    }
}

impl std::fmt::Display for CubeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
