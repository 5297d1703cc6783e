//! End-to-end 360 job: projection, per-face reconstruction, stitching,
//! optional merge and metadata.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pano_config::PipelineConfig;
use pano_cubemap::{CubeFaceExtraction, CubeProjector, FaceTable};
use pano_stitch::{FaceLayer, GlobalNormalizer, OverlapAligner, PointCloudRotator, Sampler};
use tracing::{info, warn};

use crate::metadata::{FaceDescriptor, SceneMetadata};
use crate::storage::{JobLog, METADATA_FILE_NAME};
use crate::tools::{MergeTool, ReconstructionTool};
use crate::PipelineError;

/// Numeric settings of one 360 run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub overscan_fov_deg: f64,
    pub jpeg_quality: u8,
    pub overlap_max_samples: usize,
    pub normalize_max_samples: usize,
    pub min_scale: f64,
    pub max_scale: f64,
    pub sample_seed: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            overscan_fov_deg: config.overscan_fov_deg,
            jpeg_quality: config.jpeg_quality,
            overlap_max_samples: config.overlap_max_samples,
            normalize_max_samples: config.normalize_max_samples,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            sample_seed: config.sample_seed,
        }
    }
}

/// Runs the 360 pipeline for one job directory.
pub struct MergeCoordinator {
    settings: PipelineSettings,
    reconstruct: Arc<dyn ReconstructionTool>,
    merge: Option<Arc<dyn MergeTool>>,
}

impl MergeCoordinator {
    pub fn new(
        settings: PipelineSettings,
        reconstruct: Arc<dyn ReconstructionTool>,
        merge: Option<Arc<dyn MergeTool>>,
    ) -> Self {
        Self {
            settings,
            reconstruct,
            merge,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn reconstruction_tool(&self) -> &Arc<dyn ReconstructionTool> {
        &self.reconstruct
    }

    /// Process the panorama at `input`, writing every artifact into
    /// `job_dir`. Any projection or reconstruction failure aborts the run
    /// before metadata is written.
    pub fn run(
        &self,
        input: &Path,
        job_dir: &Path,
        log: &JobLog,
    ) -> Result<SceneMetadata, PipelineError> {
        let aligner = OverlapAligner::new(
            self.settings.overlap_max_samples,
            self.settings.min_scale,
            self.settings.max_scale,
        )?;
        let normalizer = GlobalNormalizer::new(self.settings.normalize_max_samples)?;
        let mut sampler = Sampler::new(self.settings.sample_seed);

        let table = FaceTable::new(self.settings.overscan_fov_deg);
        let projector = CubeProjector::new(table.clone()).with_jpeg_quality(self.settings.jpeg_quality);
        let extractions = projector.extract_from_path(input, job_dir)?;

        let mut layers = Vec::with_capacity(extractions.len());
        let mut descriptors = Vec::with_capacity(extractions.len());
        for extraction in &extractions {
            let layer = self.reconstruct_face(extraction, job_dir, log)?;
            descriptors.push(FaceDescriptor::new(
                &extraction.spec,
                file_name(&extraction.image_path),
                file_name(&layer.path),
            ));
            layers.push(layer);
        }

        log.line("=== 360 overlap alignment ===")?;
        let report = aligner.align(&mut layers, &mut sampler);
        for line in report.log_lines() {
            log.line(&line)?;
        }
        info!(
            "Aligned {}/{} face pairs",
            report.aligned_count(),
            report.pairs.len()
        );

        log.line("=== 360 global normalize ===")?;
        match normalizer.normalize(&mut layers, &mut sampler) {
            Some(normalized) => log.line(&normalized.log_line())?,
            None => warn!("All face clouds are empty; skipping normalization"),
        }

        for layer in &layers {
            layer.save()?;
        }

        let merged_ply = self.merge_layers(input, job_dir, &layers, log)?;
        let metadata = SceneMetadata::new(table.fov_deg(), descriptors, merged_ply);
        metadata.write(&job_dir.join(METADATA_FILE_NAME))?;
        info!(
            "Scene ready in {} ({})",
            job_dir.display(),
            metadata
                .mode360
                .merged_ply
                .as_deref()
                .unwrap_or("layered output")
        );
        Ok(metadata)
    }

    /// Reconstruct one face image and rotate its cloud into the world frame.
    fn reconstruct_face(
        &self,
        extraction: &CubeFaceExtraction,
        job_dir: &Path,
        log: &JobLog,
    ) -> Result<FaceLayer, PipelineError> {
        let spec = &extraction.spec;
        log.line(&format!(
            "=== reconstruct face {} ({}) ===",
            spec.index(),
            spec.name()
        ))?;
        info!("Reconstructing face {} ({})", spec.index(), spec.name());

        let output = job_dir.join(format!("{}.ply", file_stem(&extraction.image_path)));
        self.reconstruct
            .reconstruct(&extraction.image_path, &output, job_dir, log)?;

        let mut layer = FaceLayer::load(spec.clone(), &output)?;
        PointCloudRotator.apply(spec, &mut layer.cloud);
        Ok(layer)
    }

    /// Merge the saved layers into `{input_stem}.ply`. `None` when no merge
    /// tool is configured or the merge failed.
    fn merge_layers(
        &self,
        input: &Path,
        job_dir: &Path,
        layers: &[FaceLayer],
        log: &JobLog,
    ) -> Result<Option<String>, PipelineError> {
        let Some(merge) = &self.merge else {
            info!("No merge tool available; serving {} layers", layers.len());
            return Ok(None);
        };
        log.line("=== merge 360 ply ===")?;
        let output = job_dir.join(format!("{}.ply", file_stem(input)));
        let inputs: Vec<PathBuf> = layers.iter().map(|l| l.path.clone()).collect();
        if merge.merge(&inputs, &output, log) {
            Ok(Some(file_name(&output)))
        } else {
            warn!("Merge failed; falling back to layered output");
            Ok(None)
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File stem, `scene` if the path has none.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "scene".to_string())
}
