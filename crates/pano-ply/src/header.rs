//! PLY header model and parser.
//!
//! The header is kept both parsed (to locate element data) and as raw bytes,
//! which are written back verbatim so comments, `obj_info` lines and type
//! spellings (`float` vs `float32`) survive a rewrite.

use crate::PlyError;

/// Body encoding declared by the `format` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl Format {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "ascii" => Some(Format::Ascii),
            "binary_little_endian" => Some(Format::BinaryLittleEndian),
            "binary_big_endian" => Some(Format::BinaryBigEndian),
            _ => None,
        }
    }
}

/// Scalar property types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    /// Parse both the classic (`uchar`) and sized (`uint8`) spellings.
    pub fn parse(name: &str) -> Result<Self, PlyError> {
        Ok(match name {
            "char" | "int8" => ScalarType::I8,
            "uchar" | "uint8" => ScalarType::U8,
            "short" | "int16" => ScalarType::I16,
            "ushort" | "uint16" => ScalarType::U16,
            "int" | "int32" => ScalarType::I32,
            "uint" | "uint32" => ScalarType::U32,
            "float" | "float32" => ScalarType::F32,
            "double" | "float64" => ScalarType::F64,
            other => return Err(PlyError::UnknownType(other.to_string())),
        })
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }
}

/// Shape of one property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementDef {
    pub name: String,
    pub count: usize,
    pub properties: Vec<PropertyDef>,
}

impl ElementDef {
    /// Record size in bytes if the element has no list properties.
    #[must_use]
    pub fn fixed_stride(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p.kind {
                PropertyKind::Scalar(t) => Some(t.size()),
                PropertyKind::List { .. } => None,
            })
            .sum()
    }

    #[must_use]
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

/// Parsed PLY header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub version: String,
    pub elements: Vec<ElementDef>,
}

impl Header {
    #[must_use]
    pub fn element_index(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }
}

/// Parse the header at the start of `data`.
///
/// Returns the header and the byte length of the raw header, including the
/// line terminator after `end_header`.
pub fn parse_header(data: &[u8]) -> Result<(Header, usize), PlyError> {
    let mut pos = 0;
    let mut line_no = 0;
    let mut format = None;
    let mut version = String::new();
    let mut elements: Vec<ElementDef> = Vec::new();

    loop {
        let Some(rel_end) = data[pos..].iter().position(|&b| b == b'\n') else {
            return Err(if line_no == 0 {
                PlyError::InvalidMagic
            } else {
                PlyError::UnterminatedHeader
            });
        };
        let raw = &data[pos..pos + rel_end];
        pos += rel_end + 1;
        line_no += 1;

        let line = std::str::from_utf8(raw)
            .map_err(|_| PlyError::Header {
                line: line_no,
                reason: "not valid UTF-8".to_string(),
            })?
            .trim_end_matches('\r');

        if line_no == 1 {
            if line.trim() != "ply" {
                return Err(PlyError::InvalidMagic);
            }
            continue;
        }

        let mut tokens = line.split_whitespace();
        let header_err = |reason: &str| PlyError::Header {
            line: line_no,
            reason: reason.to_string(),
        };

        match tokens.next() {
            Some("format") => {
                let fmt = tokens.next().ok_or_else(|| header_err("missing format"))?;
                format = Some(
                    Format::parse(fmt)
                        .ok_or_else(|| header_err(&format!("unknown format `{fmt}`")))?,
                );
                version = tokens.next().unwrap_or("1.0").to_string();
            }
            Some("comment") | Some("obj_info") | None => {}
            Some("element") => {
                let name = tokens.next().ok_or_else(|| header_err("missing element name"))?;
                let count = tokens
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| header_err("invalid element count"))?;
                elements.push(ElementDef {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| header_err("property before any element"))?;
                let first = tokens.next().ok_or_else(|| header_err("missing property type"))?;
                let kind = if first == "list" {
                    let count = ScalarType::parse(
                        tokens.next().ok_or_else(|| header_err("missing list count type"))?,
                    )?;
                    let item = ScalarType::parse(
                        tokens.next().ok_or_else(|| header_err("missing list item type"))?,
                    )?;
                    PropertyKind::List { count, item }
                } else {
                    PropertyKind::Scalar(ScalarType::parse(first)?)
                };
                let name = tokens.next().ok_or_else(|| header_err("missing property name"))?;
                element.properties.push(PropertyDef {
                    name: name.to_string(),
                    kind,
                });
            }
            Some("end_header") => break,
            Some(other) => return Err(header_err(&format!("unexpected keyword `{other}`"))),
        }
    }

    let format = format.ok_or(PlyError::Header {
        line: line_no,
        reason: "missing format line".to_string(),
    })?;

    Ok((
        Header {
            format,
            version,
            elements,
        },
        pos,
    ))
}
