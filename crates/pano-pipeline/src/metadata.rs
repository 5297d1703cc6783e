//! Scene metadata persisted as `metadata.json` for 360 jobs.

use std::path::Path;

use pano_cubemap::FaceSpec;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Current metadata document version.
pub const METADATA_VERSION: u32 = 1;

/// One face of a stitched scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDescriptor {
    pub index: usize,
    pub name: String,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub fov_deg: f64,
    /// Face image file name within the job directory.
    pub image: String,
    /// Face point-cloud file name within the job directory.
    pub ply: String,
}

impl FaceDescriptor {
    pub fn new(spec: &FaceSpec, image: impl Into<String>, ply: impl Into<String>) -> Self {
        Self {
            index: spec.index(),
            name: spec.name().to_string(),
            yaw_deg: spec.yaw_deg,
            pitch_deg: spec.pitch_deg,
            roll_deg: spec.roll_deg,
            fov_deg: spec.fov_deg,
            image: image.into(),
            ply: ply.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mode360Metadata {
    pub enabled: bool,
    pub overscan_fov_deg: f64,
    /// Faces in index order.
    pub faces: Vec<FaceDescriptor>,
    /// Merged cloud file name, `null` when the scene is served as layers.
    pub merged_ply: Option<String>,
    /// Per-face cloud file names in index order.
    pub layers: Vec<String>,
}

/// Versioned metadata document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMetadata {
    pub version: u32,
    pub mode360: Mode360Metadata,
}

impl SceneMetadata {
    pub fn new(
        overscan_fov_deg: f64,
        faces: Vec<FaceDescriptor>,
        merged_ply: Option<String>,
    ) -> Self {
        let layers = faces.iter().map(|f| f.ply.clone()).collect();
        Self {
            version: METADATA_VERSION,
            mode360: Mode360Metadata {
                enabled: true,
                overscan_fov_deg,
                faces,
                merged_ply,
                layers,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        std::fs::write(path, self.to_json()?).map_err(|e| PipelineError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use pano_cubemap::FaceTable;

    use super::*;

    fn sample() -> SceneMetadata {
        let table = FaceTable::default();
        let faces = table
            .iter()
            .map(|s| {
                FaceDescriptor::new(
                    s,
                    format!("face_{}.jpg", s.index()),
                    format!("face_{}.ply", s.index()),
                )
            })
            .collect();
        SceneMetadata::new(table.fov_deg(), faces, None)
    }

    #[test]
    fn test_json_uses_camel_case_and_null_merge() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        let mode = &value["mode360"];
        assert_eq!(mode["enabled"], true);
        assert_eq!(mode["overscanFovDeg"], 105.0);
        assert!(mode["mergedPly"].is_null());
        assert_eq!(mode["layers"].as_array().unwrap().len(), 6);

        let face = &mode["faces"][5];
        assert_eq!(face["name"], "-Z");
        assert_eq!(face["yawDeg"], 180.0);
        assert_eq!(face["image"], "face_5.jpg");
        assert_eq!(face["ply"], "face_5.ply");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let mut metadata = sample();
        metadata.mode360.merged_ply = Some("scene.360.ply".into());
        metadata.write(&path).unwrap();
        assert_eq!(SceneMetadata::read(&path).unwrap(), metadata);
    }
}
