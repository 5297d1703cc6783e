//! Gaussian-splat point clouds backed by a lossless PLY container.

use std::path::Path;

use glam::{DQuat, DVec3};
use tracing::debug;

use crate::body::{ByteOrder, ElementBody, ScalarSlot, split_ascii, split_binary};
use crate::header::{Header, PropertyKind, parse_header};
use crate::PlyError;

/// Name of the element that carries splat centers.
pub const VERTEX_ELEMENT: &str = "vertex";

/// Position property names.
pub const POSITION_PROPERTIES: [&str; 3] = ["x", "y", "z"];

/// Orientation property names, stored `w, x, y, z`.
pub const ROTATION_PROPERTIES: [&str; 4] = ["rot_0", "rot_1", "rot_2", "rot_3"];

/// Quaternion from file order `w, x, y, z`.
#[inline]
#[must_use]
pub fn quat_from_wxyz(wxyz: [f64; 4]) -> DQuat {
    let [w, x, y, z] = wxyz;
    DQuat::from_xyzw(x, y, z, w)
}

/// Quaternion in file order `w, x, y, z`.
#[inline]
#[must_use]
pub fn quat_to_wxyz(q: DQuat) -> [f64; 4] {
    [q.w, q.x, q.y, q.z]
}

/// A point cloud read from a PLY file.
///
/// Positions and (when all four `rot_*` properties exist) orientations are
/// decoded for editing. Everything else is kept as read: the raw header,
/// other vertex properties, other elements, and any trailing bytes. Writing
/// an unedited binary cloud reproduces the input byte for byte.
#[derive(Clone, Debug)]
pub struct PointCloud {
    raw_header: Vec<u8>,
    header: Header,
    bodies: Vec<ElementBody>,
    trailer: Vec<u8>,
    vertex: usize,
    position_slots: [ScalarSlot; 3],
    rotation_slots: Option<[ScalarSlot; 4]>,
    positions: Vec<DVec3>,
    rotations: Option<Vec<DQuat>>,
    loaded_positions: Vec<DVec3>,
    loaded_rotations: Option<Vec<DQuat>>,
}

impl PointCloud {
    /// Read and decode a PLY file.
    pub fn read(path: &Path) -> Result<Self, PlyError> {
        let data = std::fs::read(path).map_err(|source| PlyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cloud = Self::from_bytes(&data)?;
        debug!(
            "Read {} splats from {} (rotations: {})",
            cloud.len(),
            path.display(),
            cloud.has_rotation()
        );
        Ok(cloud)
    }

    /// Decode a PLY file held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PlyError> {
        let (header, header_len) = parse_header(data)?;
        let body = &data[header_len..];
        let (bodies, trailer) = match ByteOrder::of(header.format) {
            Some(order) => split_binary(&header.elements, body, order)?,
            None => split_ascii(&header.elements, body)?,
        };

        let vertex = header
            .element_index(VERTEX_ELEMENT)
            .ok_or(PlyError::MissingVertexElement)?;
        let def = &header.elements[vertex];
        if let Some(list) = def
            .properties
            .iter()
            .find(|p| matches!(p.kind, PropertyKind::List { .. }))
        {
            return Err(PlyError::ListInVertex(list.name.clone()));
        }

        let locate = |name: &'static str| {
            ScalarSlot::locate(def, name).ok_or(PlyError::MissingProperty(name))
        };
        let position_slots = [
            locate(POSITION_PROPERTIES[0])?,
            locate(POSITION_PROPERTIES[1])?,
            locate(POSITION_PROPERTIES[2])?,
        ];
        let rotation_slots = match ROTATION_PROPERTIES.map(|name| ScalarSlot::locate(def, name)) {
            [Some(w), Some(x), Some(y), Some(z)] => Some([w, x, y, z]),
            _ => None,
        };

        let body = &bodies[vertex];
        let mut positions = Vec::with_capacity(def.count);
        let mut rotations = rotation_slots.map(|_| Vec::with_capacity(def.count));
        for record in 0..def.count {
            let [x, y, z] = body.read_slots(record, &position_slots, &def.name)?;
            positions.push(DVec3::new(x, y, z));
            if let (Some(slots), Some(rotations)) = (&rotation_slots, rotations.as_mut()) {
                rotations.push(quat_from_wxyz(body.read_slots(record, slots, &def.name)?));
            }
        }

        Ok(Self {
            raw_header: data[..header_len].to_vec(),
            header,
            bodies,
            trailer,
            vertex,
            position_slots,
            rotation_slots,
            loaded_positions: positions.clone(),
            loaded_rotations: rotations.clone(),
            positions,
            rotations,
        })
    }

    /// Build a little-endian `float` cloud holding only positions and, when
    /// given, orientations.
    pub fn from_splats(positions: &[DVec3], rotations: Option<&[DQuat]>) -> Result<Self, PlyError> {
        let mut data = format!(
            "ply\nformat binary_little_endian 1.0\nelement vertex {}\n\
             property float x\nproperty float y\nproperty float z\n",
            positions.len()
        );
        if rotations.is_some() {
            for name in ROTATION_PROPERTIES {
                data.push_str(&format!("property float {name}\n"));
            }
        }
        data.push_str("end_header\n");

        let mut data = data.into_bytes();
        for (i, p) in positions.iter().enumerate() {
            let mut values = vec![p.x, p.y, p.z];
            if let Some(rotations) = rotations {
                let q = rotations.get(i).copied().unwrap_or(DQuat::IDENTITY);
                values.extend(quat_to_wxyz(q));
            }
            for v in values {
                data.extend_from_slice(&(v as f32).to_le_bytes());
            }
        }
        Self::from_bytes(&data)
    }

    /// Parsed header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of splats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [DVec3] {
        &mut self.positions
    }

    /// True if every splat carries an orientation.
    #[must_use]
    pub fn has_rotation(&self) -> bool {
        self.rotations.is_some()
    }

    /// Splat orientations, `None` when the file lacks any `rot_*` property.
    #[must_use]
    pub fn rotations(&self) -> Option<&[DQuat]> {
        self.rotations.as_deref()
    }

    pub fn rotations_mut(&mut self) -> Option<&mut [DQuat]> {
        self.rotations.as_deref_mut()
    }

    /// Mutable positions and orientations together.
    pub fn splats_mut(&mut self) -> (&mut [DVec3], Option<&mut [DQuat]>) {
        (&mut self.positions, self.rotations.as_deref_mut())
    }

    /// Encode the cloud, re-encoding only vertex records whose position or
    /// orientation changed since it was read.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut vertex_body = self.bodies[self.vertex].clone();
        for (record, (now, before)) in self
            .positions
            .iter()
            .zip(&self.loaded_positions)
            .enumerate()
        {
            if now != before {
                vertex_body.write_slots(record, &self.position_slots, now.to_array());
            }
        }
        if let (Some(slots), Some(now), Some(before)) = (
            &self.rotation_slots,
            &self.rotations,
            &self.loaded_rotations,
        ) {
            for (record, (q, q0)) in now.iter().zip(before).enumerate() {
                if q != q0 {
                    vertex_body.write_slots(record, slots, quat_to_wxyz(*q));
                }
            }
        }

        let mut out = Vec::with_capacity(self.raw_header.len() + self.body_len_hint());
        out.extend_from_slice(&self.raw_header);
        for (index, body) in self.bodies.iter().enumerate() {
            if index == self.vertex {
                vertex_body.write_to(&mut out);
            } else {
                body.write_to(&mut out);
            }
        }
        out.extend_from_slice(&self.trailer);
        out
    }

    /// Encode and write to `path`.
    pub fn write(&self, path: &Path) -> Result<(), PlyError> {
        std::fs::write(path, self.to_bytes()).map_err(|source| PlyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Wrote {} splats to {}", self.len(), path.display());
        Ok(())
    }

    fn body_len_hint(&self) -> usize {
        self.bodies
            .iter()
            .map(|b| match b {
                ElementBody::Binary { bytes, .. } => bytes.len(),
                ElementBody::Ascii { lines } => lines.iter().map(|l| l.len() + 1).sum(),
            })
            .sum::<usize>()
            + self.trailer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Format;

    /// Binary splat file with an extra opacity property, a face element with
    /// a list property, and trailing bytes.
    fn binary_fixture(order_le: bool) -> Vec<u8> {
        let format = if order_le {
            "binary_little_endian"
        } else {
            "binary_big_endian"
        };
        let mut data = format!(
            "ply\nformat {format} 1.0\ncomment fixture\n\
             element vertex 2\n\
             property float x\nproperty float y\nproperty float z\n\
             property float opacity\n\
             property float rot_0\nproperty float rot_1\nproperty float rot_2\nproperty float rot_3\n\
             element extra 1\nproperty list uchar int ids\n\
             end_header\n"
        )
        .into_bytes();
        let push = |data: &mut Vec<u8>, v: f32| {
            if order_le {
                data.extend_from_slice(&v.to_le_bytes());
            } else {
                data.extend_from_slice(&v.to_be_bytes());
            }
        };
        for (i, base) in [1.0f32, -2.0].into_iter().enumerate() {
            push(&mut data, base);
            push(&mut data, base * 2.0);
            push(&mut data, base * 3.0);
            push(&mut data, 0.5 + i as f32);
            for r in [1.0f32, 0.0, 0.0, 0.0] {
                push(&mut data, r);
            }
        }
        data.push(2);
        for id in [7i32, 9] {
            if order_le {
                data.extend_from_slice(&id.to_le_bytes());
            } else {
                data.extend_from_slice(&id.to_be_bytes());
            }
        }
        data.extend_from_slice(b"TRAILER");
        data
    }

    #[test]
    fn test_unedited_binary_roundtrip_is_byte_exact() {
        for le in [true, false] {
            let data = binary_fixture(le);
            let cloud = PointCloud::from_bytes(&data).unwrap();
            assert_eq!(cloud.len(), 2);
            assert!(cloud.has_rotation());
            assert_eq!(cloud.positions()[1], DVec3::new(-2.0, -4.0, -6.0));
            assert_eq!(cloud.to_bytes(), data);
        }
    }

    #[test]
    fn test_position_edit_leaves_other_bytes_untouched() {
        let data = binary_fixture(true);
        let mut cloud = PointCloud::from_bytes(&data).unwrap();
        cloud.positions_mut()[0] = DVec3::new(10.0, 20.0, 30.0);
        let out = cloud.to_bytes();
        assert_eq!(out.len(), data.len());

        let reread = PointCloud::from_bytes(&out).unwrap();
        assert_eq!(reread.positions()[0], DVec3::new(10.0, 20.0, 30.0));
        assert_eq!(reread.positions()[1], DVec3::new(-2.0, -4.0, -6.0));

        let header_len = parse_header(&data).unwrap().1;
        // First record: x, y, z changed; opacity and rotation did not.
        assert_ne!(out[header_len..header_len + 12], data[header_len..header_len + 12]);
        assert_eq!(out[header_len + 12..], data[header_len + 12..]);
    }

    #[test]
    fn test_rotation_edit_is_written_wxyz() {
        let data = binary_fixture(false);
        let mut cloud = PointCloud::from_bytes(&data).unwrap();
        let q = DQuat::from_xyzw(0.0, 0.0, 1.0, 0.0);
        cloud.rotations_mut().unwrap()[1] = q;
        let reread = PointCloud::from_bytes(&cloud.to_bytes()).unwrap();
        assert_eq!(reread.rotations().unwrap()[1], q);
        assert_eq!(reread.rotations().unwrap()[0], DQuat::IDENTITY);
    }

    #[test]
    fn test_partial_rotation_properties_mean_no_rotation() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\n\
                    property float x\nproperty float y\nproperty float z\n\
                    property float rot_0\nproperty float rot_1\n\
                    end_header\n1 2 3 1 0\n";
        let cloud = PointCloud::from_bytes(text.as_bytes()).unwrap();
        assert!(!cloud.has_rotation());
        assert!(cloud.rotations().is_none());
    }

    #[test]
    fn test_ascii_edits_only_touched_lines() {
        let text = "ply\nformat ascii 1.0\nelement vertex 2\n\
                    property float x\nproperty float y\nproperty float z\n\
                    property uchar red\n\
                    end_header\n1.000 2.000 3.000 255\n4.0 5.0 6.0 12\n";
        let mut cloud = PointCloud::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(cloud.to_bytes(), text.as_bytes());

        cloud.positions_mut()[1] = DVec3::new(0.5, -1.0, 2.0);
        let out = String::from_utf8(cloud.to_bytes()).unwrap();
        assert!(out.ends_with("1.000 2.000 3.000 255\n0.5 -1 2 12\n"), "{out}");
    }

    #[test]
    fn test_missing_vertex_element() {
        let text = "ply\nformat ascii 1.0\nelement face 0\nproperty list uchar int idx\nend_header\n";
        assert!(matches!(
            PointCloud::from_bytes(text.as_bytes()),
            Err(PlyError::MissingVertexElement)
        ));
    }

    #[test]
    fn test_missing_position_property() {
        let text = "ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nend_header\n";
        assert!(matches!(
            PointCloud::from_bytes(text.as_bytes()),
            Err(PlyError::MissingProperty("z"))
        ));
    }

    #[test]
    fn test_truncated_binary_body() {
        let mut data = binary_fixture(true);
        let header_len = parse_header(&data).unwrap().1;
        data.truncate(header_len + 40);
        assert!(matches!(
            PointCloud::from_bytes(&data),
            Err(PlyError::Truncated { element, .. }) if element == "vertex"
        ));
    }

    #[test]
    fn test_oversized_vertex_count_is_an_error() {
        let ascii = "ply\nformat ascii 1.0\nelement vertex 100000000000000\n\
                     property float x\nproperty float y\nproperty float z\n\
                     end_header\n1 2 3\n";
        assert!(matches!(
            PointCloud::from_bytes(ascii.as_bytes()),
            Err(PlyError::Truncated { record: 1, .. })
        ));

        let binary = format!(
            "ply\nformat binary_little_endian 1.0\nelement vertex {}\n\
             property float x\nproperty float y\nproperty float z\nend_header\n",
            usize::MAX / 12 + 1
        );
        assert!(matches!(
            PointCloud::from_bytes(binary.as_bytes()),
            Err(PlyError::Truncated { record: 0, .. })
        ));
    }

    #[test]
    fn test_wxyz_helpers_use_file_order() {
        let q = quat_from_wxyz([0.5, -0.5, 0.25, 0.75]);
        assert_eq!((q.w, q.x, q.y, q.z), (0.5, -0.5, 0.25, 0.75));
        assert_eq!(quat_to_wxyz(q), [0.5, -0.5, 0.25, 0.75]);
    }

    #[test]
    fn test_from_splats() {
        let positions = [DVec3::new(1.0, 2.0, 3.0), DVec3::new(-0.5, 0.0, 4.0)];
        let cloud = PointCloud::from_splats(&positions, None).unwrap();
        assert_eq!(cloud.positions(), &positions);
        assert!(!cloud.has_rotation());

        let rotations = [DQuat::IDENTITY, DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0)];
        let cloud = PointCloud::from_splats(&positions, Some(&rotations[..])).unwrap();
        assert_eq!(cloud.rotations().unwrap(), &rotations);
        assert_eq!(cloud.header().format, Format::BinaryLittleEndian);
    }

    #[test]
    fn test_file_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        let data = binary_fixture(true);
        std::fs::write(&path, &data).unwrap();

        let mut cloud = PointCloud::read(&path).unwrap();
        cloud.positions_mut()[0].x += 1.0;
        cloud.write(&path).unwrap();

        let reread = PointCloud::read(&path).unwrap();
        assert_eq!(reread.positions()[0].x, 2.0);
    }
}
