//! Stitching of independently reconstructed cube-face clouds into one scene:
//! per-face rotation into the world frame, overlap-based depth alignment,
//! and a shared flip-and-center normalization.

mod aligner;
mod error;
mod layer;
mod normalizer;
mod rotator;
mod sampling;

pub use aligner::{
    ALIGNMENT_PAIRS, AlignmentReport, DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE,
    DEFAULT_OVERLAP_MAX_SAMPLES, OverlapAligner, PairOutcome, PairResult, SkipReason,
    apply_depth_correction,
};
pub use error::StitchError;
pub use layer::FaceLayer;
pub use normalizer::{
    Aabb, DEFAULT_NORMALIZE_MAX_SAMPLES, GlobalNormalizer, NormalizeReport, SceneTransform,
};
pub use rotator::PointCloudRotator;
pub use sampling::{Sampler, median};
