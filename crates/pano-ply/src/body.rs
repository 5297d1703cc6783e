//! Element data storage with in-place scalar editing.
//!
//! Binary elements keep their exact bytes; scalar edits overwrite only the
//! edited property's bytes. ASCII elements keep one line per record and
//! re-render only the lines that were edited.

use crate::header::{ElementDef, Format, PropertyKind, ScalarType};
use crate::PlyError;

/// Byte order of binary element data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub(crate) fn of(format: Format) -> Option<Self> {
        match format {
            Format::Ascii => None,
            Format::BinaryLittleEndian => Some(ByteOrder::Little),
            Format::BinaryBigEndian => Some(ByteOrder::Big),
        }
    }
}

/// Decode one scalar as `f64`.
pub(crate) fn read_scalar(bytes: &[u8], ty: ScalarType, order: ByteOrder) -> f64 {
    macro_rules! decode {
        ($t:ty, $n:expr) => {{
            let mut buf = [0u8; $n];
            buf.copy_from_slice(&bytes[..$n]);
            match order {
                ByteOrder::Little => <$t>::from_le_bytes(buf) as f64,
                ByteOrder::Big => <$t>::from_be_bytes(buf) as f64,
            }
        }};
    }
    match ty {
        ScalarType::I8 => bytes[0] as i8 as f64,
        ScalarType::U8 => bytes[0] as f64,
        ScalarType::I16 => decode!(i16, 2),
        ScalarType::U16 => decode!(u16, 2),
        ScalarType::I32 => decode!(i32, 4),
        ScalarType::U32 => decode!(u32, 4),
        ScalarType::F32 => decode!(f32, 4),
        ScalarType::F64 => decode!(f64, 8),
    }
}

/// Encode one scalar into `out[..ty.size()]`. Integer targets round and saturate.
pub(crate) fn write_scalar(out: &mut [u8], ty: ScalarType, order: ByteOrder, value: f64) {
    macro_rules! encode {
        ($v:expr) => {{
            let v = $v;
            let bytes = match order {
                ByteOrder::Little => v.to_le_bytes(),
                ByteOrder::Big => v.to_be_bytes(),
            };
            out[..bytes.len()].copy_from_slice(&bytes);
        }};
    }
    match ty {
        ScalarType::I8 => encode!(value.round() as i8),
        ScalarType::U8 => encode!(value.round() as u8),
        ScalarType::I16 => encode!(value.round() as i16),
        ScalarType::U16 => encode!(value.round() as u16),
        ScalarType::I32 => encode!(value.round() as i32),
        ScalarType::U32 => encode!(value.round() as u32),
        ScalarType::F32 => encode!(value as f32),
        ScalarType::F64 => encode!(value),
    }
}

/// Render a scalar as an ASCII token.
pub(crate) fn format_scalar(ty: ScalarType, value: f64) -> String {
    match ty {
        ScalarType::F32 => format!("{}", value as f32),
        ScalarType::F64 => format!("{value}"),
        ScalarType::I8 => format!("{}", value.round() as i8),
        ScalarType::U8 => format!("{}", value.round() as u8),
        ScalarType::I16 => format!("{}", value.round() as i16),
        ScalarType::U16 => format!("{}", value.round() as u16),
        ScalarType::I32 => format!("{}", value.round() as i32),
        ScalarType::U32 => format!("{}", value.round() as u32),
    }
}

/// Stored data of one element.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ElementBody {
    Binary {
        order: ByteOrder,
        /// Exact bytes of all records.
        bytes: Vec<u8>,
        /// Fixed record size, `None` if the element has list properties.
        stride: Option<usize>,
    },
    Ascii {
        /// One line per record, without terminator.
        lines: Vec<String>,
    },
}

/// Byte length of one binary record starting at `data[0]`, or `None` if truncated.
fn binary_record_len(def: &ElementDef, data: &[u8], order: ByteOrder) -> Option<usize> {
    let mut len = 0;
    for prop in &def.properties {
        match prop.kind {
            PropertyKind::Scalar(t) => len += t.size(),
            PropertyKind::List { count, item } => {
                let count_bytes = data.get(len..len + count.size())?;
                let n = read_scalar(count_bytes, count, order);
                if !(n >= 0.0) {
                    return None;
                }
                len = (n as usize)
                    .checked_mul(item.size())
                    .and_then(|items| items.checked_add(len + count.size()))?;
            }
        }
    }
    (len <= data.len()).then_some(len)
}

/// Split the binary body into per-element blocks.
pub(crate) fn split_binary(
    elements: &[ElementDef],
    data: &[u8],
    order: ByteOrder,
) -> Result<(Vec<ElementBody>, Vec<u8>), PlyError> {
    let mut pos = 0;
    let mut bodies = Vec::with_capacity(elements.len());
    for def in elements {
        let start = pos;
        let stride = def.fixed_stride();
        match stride {
            Some(stride) => {
                let needed = stride.checked_mul(def.count);
                let Some(needed) = needed.filter(|&n| n <= data.len() - pos) else {
                    return Err(PlyError::Truncated {
                        element: def.name.clone(),
                        record: (data.len() - pos) / stride.max(1),
                        count: def.count,
                    });
                };
                pos += needed;
            }
            None => {
                for record in 0..def.count {
                    let len = binary_record_len(def, &data[pos..], order).ok_or_else(|| {
                        PlyError::Truncated {
                            element: def.name.clone(),
                            record,
                            count: def.count,
                        }
                    })?;
                    pos += len;
                }
            }
        }
        bodies.push(ElementBody::Binary {
            order,
            bytes: data[start..pos].to_vec(),
            stride,
        });
    }
    Ok((bodies, data[pos..].to_vec()))
}

/// Split the ASCII body into per-element line blocks.
///
/// Blank lines between records are dropped; anything after the last element
/// is returned as the trailer.
pub(crate) fn split_ascii(
    elements: &[ElementDef],
    data: &[u8],
) -> Result<(Vec<ElementBody>, Vec<u8>), PlyError> {
    let mut pos = 0;
    let mut bodies = Vec::with_capacity(elements.len());
    for def in elements {
        // Every record takes at least one token and a newline.
        let mut lines = Vec::with_capacity(def.count.min((data.len() - pos) / 2));
        while lines.len() < def.count {
            if pos >= data.len() {
                return Err(PlyError::Truncated {
                    element: def.name.clone(),
                    record: lines.len(),
                    count: def.count,
                });
            }
            let end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(data.len(), |e| pos + e);
            let raw = &data[pos..end];
            pos = (end + 1).min(data.len());

            let line = std::str::from_utf8(raw)
                .map_err(|_| PlyError::AsciiRecord {
                    element: def.name.clone(),
                    record: lines.len(),
                    reason: "not valid UTF-8".to_string(),
                })?
                .trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            lines.push(line.to_string());
        }
        bodies.push(ElementBody::Ascii { lines });
    }
    Ok((bodies, data[pos..].to_vec()))
}

impl ElementBody {
    /// Append the element's data to `out`.
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            ElementBody::Binary { bytes, .. } => out.extend_from_slice(bytes),
            ElementBody::Ascii { lines } => {
                for line in lines {
                    out.extend_from_slice(line.as_bytes());
                    out.push(b'\n');
                }
            }
        }
    }
}

/// Location of one scalar property inside a fixed-layout element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ScalarSlot {
    /// Byte offset within a binary record.
    pub byte_offset: usize,
    /// Token index within an ASCII record.
    pub token: usize,
    pub ty: ScalarType,
}

impl ScalarSlot {
    /// Locate a scalar property in an element without list properties.
    pub(crate) fn locate(def: &ElementDef, name: &str) -> Option<Self> {
        let mut byte_offset = 0;
        for (token, prop) in def.properties.iter().enumerate() {
            let PropertyKind::Scalar(ty) = prop.kind else {
                return None;
            };
            if prop.name == name {
                return Some(Self {
                    byte_offset,
                    token,
                    ty,
                });
            }
            byte_offset += ty.size();
        }
        None
    }
}

impl ElementBody {
    /// Read several scalar slots of one record.
    pub(crate) fn read_slots<const N: usize>(
        &self,
        record: usize,
        slots: &[ScalarSlot; N],
        element: &str,
    ) -> Result<[f64; N], PlyError> {
        let mut out = [0.0; N];
        match self {
            ElementBody::Binary {
                order,
                bytes,
                stride,
            } => {
                let stride = stride.unwrap_or(0);
                let base = record * stride;
                for (value, slot) in out.iter_mut().zip(slots) {
                    let at = base + slot.byte_offset;
                    *value = read_scalar(&bytes[at..at + slot.ty.size()], slot.ty, *order);
                }
            }
            ElementBody::Ascii { lines } => {
                let tokens: Vec<&str> = lines[record].split_whitespace().collect();
                for (value, slot) in out.iter_mut().zip(slots) {
                    let token = tokens.get(slot.token).ok_or_else(|| PlyError::AsciiRecord {
                        element: element.to_string(),
                        record,
                        reason: format!("missing token {}", slot.token),
                    })?;
                    *value = token.parse().map_err(|_| PlyError::AsciiRecord {
                        element: element.to_string(),
                        record,
                        reason: format!("invalid number `{token}`"),
                    })?;
                }
            }
        }
        Ok(out)
    }

    /// Overwrite several scalar slots of one record, leaving every other
    /// property untouched.
    pub(crate) fn write_slots<const N: usize>(
        &mut self,
        record: usize,
        slots: &[ScalarSlot; N],
        values: [f64; N],
    ) {
        match self {
            ElementBody::Binary {
                order,
                bytes,
                stride,
            } => {
                let base = record * stride.unwrap_or(0);
                for (slot, value) in slots.iter().zip(values) {
                    let at = base + slot.byte_offset;
                    write_scalar(&mut bytes[at..at + slot.ty.size()], slot.ty, *order, value);
                }
            }
            ElementBody::Ascii { lines } => {
                let mut tokens: Vec<String> = lines[record]
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                for (slot, value) in slots.iter().zip(values) {
                    if let Some(token) = tokens.get_mut(slot.token) {
                        *token = format_scalar(slot.ty, value);
                    }
                }
                lines[record] = tokens.join(" ");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_codec_both_orders() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let mut buf = [0u8; 8];
            write_scalar(&mut buf, ScalarType::F32, order, 1.5);
            assert_eq!(read_scalar(&buf, ScalarType::F32, order), 1.5);
            write_scalar(&mut buf, ScalarType::I16, order, -300.0);
            assert_eq!(read_scalar(&buf, ScalarType::I16, order), -300.0);
            write_scalar(&mut buf, ScalarType::F64, order, -2.25);
            assert_eq!(read_scalar(&buf, ScalarType::F64, order), -2.25);
        }
    }

    #[test]
    fn test_integer_targets_saturate() {
        let mut buf = [0u8; 1];
        write_scalar(&mut buf, ScalarType::U8, ByteOrder::Little, 300.0);
        assert_eq!(buf[0], 255);
        write_scalar(&mut buf, ScalarType::U8, ByteOrder::Little, -4.0);
        assert_eq!(buf[0], 0);
    }

    fn xyz_element(count: usize) -> ElementDef {
        let text = format!(
            "ply\nformat ascii 1.0\nelement vertex {count}\n\
             property float x\nproperty float y\nproperty float z\nend_header\n"
        );
        let (header, _) = crate::header::parse_header(text.as_bytes()).unwrap();
        header.elements.into_iter().next().unwrap()
    }

    #[test]
    fn test_binary_count_overflowing_stride_is_truncated() {
        let def = xyz_element(usize::MAX / 12 + 1);
        let err = split_binary(std::slice::from_ref(&def), &[0u8; 24], ByteOrder::Little)
            .unwrap_err();
        assert!(matches!(err, PlyError::Truncated { record: 2, .. }), "{err:?}");
    }

    #[test]
    fn test_ascii_count_beyond_body_is_truncated() {
        let def = xyz_element(100_000_000_000_000);
        let err = split_ascii(std::slice::from_ref(&def), b"1 2 3\n").unwrap_err();
        assert!(matches!(err, PlyError::Truncated { record: 1, .. }), "{err:?}");
    }

    #[test]
    fn test_format_scalar_shortest_float() {
        assert_eq!(format_scalar(ScalarType::F32, 0.1), "0.1");
        assert_eq!(format_scalar(ScalarType::U8, 254.6), "255");
    }
}
