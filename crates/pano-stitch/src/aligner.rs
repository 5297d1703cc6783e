//! Per-face depth correction from overlapping view cones.
//!
//! Each face is reconstructed with its own unknown depth scale. Neighboring
//! faces see the same surfaces where their overscanned cones overlap, so the
//! median depth of those surfaces should agree. Faces are corrected one
//! directed pair at a time, with `+Z` as the fixed anchor.

use std::fmt;

use glam::DVec3;
use pano_cubemap::CubeFace;
use tracing::{info, warn};

use crate::layer::{FaceLayer, find_layer};
use crate::sampling::{Sampler, median};
use crate::StitchError;

/// Default per-side cap on overlap samples.
pub const DEFAULT_OVERLAP_MAX_SAMPLES: usize = 50_000;

/// Default lower bound of the scale correction.
pub const DEFAULT_MIN_SCALE: f64 = 0.5;

/// Default upper bound of the scale correction.
pub const DEFAULT_MAX_SCALE: f64 = 2.0;

/// Directions shorter than this are treated as having this length.
const MIN_DIRECTION_NORM: f64 = 1e-6;

/// Fixed `(target, reference)` order. Later pairs see earlier corrections.
pub const ALIGNMENT_PAIRS: [(CubeFace, CubeFace); 5] = [
    (CubeFace::PosX, CubeFace::PosZ),
    (CubeFace::NegX, CubeFace::PosZ),
    (CubeFace::PosY, CubeFace::PosZ),
    (CubeFace::NegY, CubeFace::PosZ),
    (CubeFace::NegZ, CubeFace::PosX),
];

/// Why a pair was left uncorrected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// One side had no points inside both view cones.
    NoOverlap,
    /// A side's median depth was not finite.
    NonFiniteMedian,
    /// The target's median depth was zero or negative.
    NonPositiveTarget,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PairResult {
    Aligned { scale: f64, offset: f64 },
    Skipped(SkipReason),
}

/// Outcome of one directed pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairOutcome {
    pub target: CubeFace,
    pub reference: CubeFace,
    pub result: PairResult,
}

impl fmt::Display for PairOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.result {
            PairResult::Aligned { scale, offset } => write!(
                f,
                "align {} -> {}: scale={scale:.3}, offset={offset:.3}",
                self.target, self.reference
            ),
            PairResult::Skipped(_) => {
                write!(f, "skip alignment {} -> {}", self.target, self.reference)
            }
        }
    }
}

/// Every pair outcome of one alignment pass, in processing order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentReport {
    pub pairs: Vec<PairOutcome>,
}

impl AlignmentReport {
    /// One job-log line per pair.
    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.pairs.iter().map(ToString::to_string).collect()
    }

    #[must_use]
    pub fn aligned_count(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p.result, PairResult::Aligned { .. }))
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlapAligner {
    max_samples: usize,
    min_scale: f64,
    max_scale: f64,
}

impl Default for OverlapAligner {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_OVERLAP_MAX_SAMPLES,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
        }
    }
}

impl OverlapAligner {
    pub fn new(max_samples: usize, min_scale: f64, max_scale: f64) -> Result<Self, StitchError> {
        if max_samples == 0 {
            return Err(StitchError::ZeroSampleCap);
        }
        if !(min_scale > 0.0 && min_scale <= max_scale) {
            return Err(StitchError::InvalidScaleRange {
                min: min_scale,
                max: max_scale,
            });
        }
        Ok(Self {
            max_samples,
            min_scale,
            max_scale,
        })
    }

    /// Run every pair in [`ALIGNMENT_PAIRS`] order, correcting targets in
    /// place. Pairs whose faces are not both present are not reported.
    pub fn align(&self, layers: &mut [FaceLayer], sampler: &mut Sampler) -> AlignmentReport {
        let mut report = AlignmentReport::default();
        if find_layer(layers, CubeFace::PosZ).is_none() {
            warn!("No +Z layer; skipping overlap alignment");
            return report;
        }

        for (target, reference) in ALIGNMENT_PAIRS {
            let (Some(t), Some(r)) = (find_layer(layers, target), find_layer(layers, reference))
            else {
                continue;
            };
            let result = self.align_pair(layers, t, r, sampler);
            let outcome = PairOutcome {
                target,
                reference,
                result,
            };
            match result {
                PairResult::Aligned { .. } => info!("{outcome}"),
                PairResult::Skipped(reason) => warn!("{outcome} ({reason:?})"),
            }
            report.pairs.push(outcome);
        }
        report
    }

    fn align_pair(
        &self,
        layers: &mut [FaceLayer],
        target: usize,
        reference: usize,
        sampler: &mut Sampler,
    ) -> PairResult {
        let forward = layers[target].spec.basis.forward;
        let ref_forward = layers[reference].spec.basis.forward;
        let cos_half = layers[target].spec.cos_half_fov();

        let target_depths = self.overlap_depths(
            layers[target].cloud.positions(),
            forward,
            ref_forward,
            cos_half,
            sampler,
        );
        let ref_depths = self.overlap_depths(
            layers[reference].cloud.positions(),
            ref_forward,
            forward,
            cos_half,
            sampler,
        );
        let (Some(target_depths), Some(ref_depths)) = (target_depths, ref_depths) else {
            return PairResult::Skipped(SkipReason::NoOverlap);
        };

        let (Some(target_median), Some(ref_median)) = (median(&target_depths), median(&ref_depths))
        else {
            return PairResult::Skipped(SkipReason::NonFiniteMedian);
        };
        if target_median <= 0.0 {
            return PairResult::Skipped(SkipReason::NonPositiveTarget);
        }

        let scale = (ref_median / target_median).clamp(self.min_scale, self.max_scale);
        let offset = ref_median - scale * target_median;
        apply_depth_correction(layers[target].cloud.positions_mut(), forward, scale, offset);
        PairResult::Aligned { scale, offset }
    }

    /// Depths along `forward` of points whose direction lies inside both
    /// cones, subsampled to the cap. `None` if no point qualifies.
    fn overlap_depths(
        &self,
        positions: &[DVec3],
        forward: DVec3,
        other_forward: DVec3,
        cos_half: f64,
        sampler: &mut Sampler,
    ) -> Option<Vec<f64>> {
        let candidates: Vec<usize> = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let dir = **p / p.length().max(MIN_DIRECTION_NORM);
                dir.dot(forward) >= cos_half && dir.dot(other_forward) >= cos_half
            })
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let picked = sampler.subsample(&candidates, self.max_samples);
        Some(
            picked
                .into_iter()
                .map(|i| positions[i].dot(forward))
                .filter(|d| d.is_finite())
                .collect(),
        )
    }
}

/// Scale and shift positions along `forward` only:
/// `p' = p + (scale − 1)(p · f) f + offset · f`.
pub fn apply_depth_correction(positions: &mut [DVec3], forward: DVec3, scale: f64, offset: f64) {
    for p in positions {
        let depth = p.dot(forward);
        *p += forward * ((scale - 1.0) * depth + offset);
    }
}
