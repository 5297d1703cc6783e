//! Lossless PLY reading and editing for Gaussian-splat point clouds.
//!
//! Only splat centers (`x`, `y`, `z`) and orientations (`rot_0..rot_3`) are
//! decoded. All other properties, elements and bytes pass through untouched.

mod body;
mod cloud;
mod error;
mod header;

pub use cloud::{
    POSITION_PROPERTIES, PointCloud, ROTATION_PROPERTIES, VERTEX_ELEMENT, quat_from_wxyz,
    quat_to_wxyz,
};
pub use error::PlyError;
pub use header::{ElementDef, Format, Header, PropertyDef, PropertyKind, ScalarType, parse_header};
