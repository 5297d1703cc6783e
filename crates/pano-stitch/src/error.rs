//! Stitching error types.

use std::path::PathBuf;

use pano_ply::PlyError;

/// Errors raised while loading, transforming, or saving face layers.
#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    /// A face's point cloud could not be read or written.
    #[error("point cloud {}: {source}", path.display())]
    Ply {
        path: PathBuf,
        #[source]
        source: PlyError,
    },

    /// The scale clamp range is empty or non-positive.
    #[error("invalid scale range [{min}, {max}]")]
    InvalidScaleRange { min: f64, max: f64 },

    /// A subsampling cap of zero would discard every point.
    #[error("sample cap must be at least 1")]
    ZeroSampleCap,
}
