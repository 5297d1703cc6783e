//! PLY error types.

use std::path::PathBuf;

/// Errors that can occur while reading, editing, or writing a PLY file.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// The file could not be read or written.
    #[error("PLY I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data does not start with the `ply` magic line.
    #[error("not a PLY file (missing `ply` magic)")]
    InvalidMagic,

    /// No `end_header` line was found.
    #[error("PLY header is not terminated by `end_header`")]
    UnterminatedHeader,

    /// A header line could not be parsed.
    #[error("invalid PLY header line {line}: {reason}")]
    Header { line: usize, reason: String },

    /// A property uses a type name outside the PLY format.
    #[error("unknown PLY property type `{0}`")]
    UnknownType(String),

    /// Element data ended before all records were read.
    #[error("PLY element `{element}` truncated at record {record} of {count}")]
    Truncated {
        element: String,
        record: usize,
        count: usize,
    },

    /// An ASCII record could not be parsed.
    #[error("invalid ASCII record in element `{element}` at record {record}: {reason}")]
    AsciiRecord {
        element: String,
        record: usize,
        reason: String,
    },

    /// The file has no `vertex` element.
    #[error("PLY file has no `vertex` element")]
    MissingVertexElement,

    /// The vertex element lacks a required scalar property.
    #[error("PLY vertex element has no scalar property `{0}`")]
    MissingProperty(&'static str),

    /// The vertex element contains list properties, which cannot be edited in place.
    #[error("PLY vertex element contains list property `{0}`")]
    ListInVertex(String),
}
