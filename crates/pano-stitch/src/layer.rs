//! A reconstructed face cloud paired with the face it was captured from.

use std::path::{Path, PathBuf};

use pano_cubemap::{CubeFace, FaceSpec};
use pano_ply::PointCloud;

use crate::StitchError;

/// One face's point cloud as it moves through the stitching stages.
#[derive(Clone, Debug)]
pub struct FaceLayer {
    pub spec: FaceSpec,
    pub cloud: PointCloud,
    /// File the cloud was read from and is written back to.
    pub path: PathBuf,
}

impl FaceLayer {
    pub fn load(spec: FaceSpec, path: &Path) -> Result<Self, StitchError> {
        let cloud = PointCloud::read(path).map_err(|source| StitchError::Ply {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            spec,
            cloud,
            path: path.to_path_buf(),
        })
    }

    /// Write the cloud back to [`path`](Self::path).
    pub fn save(&self) -> Result<(), StitchError> {
        self.cloud.write(&self.path).map_err(|source| StitchError::Ply {
            path: self.path.clone(),
            source,
        })
    }

    #[must_use]
    pub fn face(&self) -> CubeFace {
        self.spec.face
    }
}

/// Position of `face` within `layers`.
pub(crate) fn find_layer(layers: &[FaceLayer], face: CubeFace) -> Option<usize> {
    layers.iter().position(|l| l.face() == face)
}
