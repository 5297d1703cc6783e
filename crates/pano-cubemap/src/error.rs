//! Projection error types.

use std::path::PathBuf;

/// Errors raised while loading a panorama or writing face images.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The source panorama does not exist.
    #[error("360 source image not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The source panorama exists but could not be decoded.
    #[error("failed to decode 360 source image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The source panorama has a zero dimension.
    #[error("360 source image has invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The source panorama is not close enough to 2:1.
    #[error("360 source image must be ~2:1 aspect ratio; got {width}x{height}")]
    AspectRatio { width: u32, height: u32 },

    /// JPEG encoding of a face image failed.
    #[error("failed to encode face image: {0}")]
    Encode(#[source] image::ImageError),

    /// Writing a face image to disk failed.
    #[error("failed to write face image {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProjectionError {
    /// True for errors caused by a bad panorama rather than a missing or
    /// unreadable file.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProjectionError::InvalidDimensions { .. } | ProjectionError::AspectRatio { .. }
        )
    }
}
