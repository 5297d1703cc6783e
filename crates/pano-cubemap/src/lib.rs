//! Cube-face geometry for 360° panoramas: the fixed face table, camera bases
//! and their quaternion conventions, and equirectangular → perspective
//! projection.

mod cube_face;
mod equirect;
mod error;
pub mod exif;
mod face_table;
mod projector;
mod rotation;

pub use cube_face::CubeFace;
pub use equirect::{
    ASPECT_TOLERANCE, EquirectImage, direction_to_lon_lat, lon_lat_to_pixel, validate_dimensions,
};
pub use error::ProjectionError;
pub use face_table::{
    CubeFaceExtraction, DEFAULT_OVERSCAN_FOV_DEG, FaceSpec, FaceTable, MAX_OVERSCAN_FOV_DEG,
    MIN_OVERSCAN_FOV_DEG, clamp_fov,
};
pub use projector::{
    CubeProjector, DEFAULT_JPEG_QUALITY, face_image_name, pixel_to_ndc, ray_direction,
};
pub use rotation::{
    FaceBasis, IMAGE_ROW_FLIP, conjugate_by_axis_signs, matrix_from_quat, quat_from_matrix,
};
