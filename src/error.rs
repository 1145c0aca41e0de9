//! Central error types for the cache and ClientScript layer.
//!
//! Recoverable conditions (skipped opcode-definition lines, opcodes without
//! a table entry) are diagnostics only and never appear here. This enum
//! carries the failures a caller actually has to handle. Per-call failures
//! (`RecordNotFound`, `ShortRead`, ...) leave the store usable for further
//! calls; construction failures (`NoCacheDetected`, `AmbiguousEnvironment`)
//! mean no store is returned at all.

use core::fmt;

/// All error conditions surfaced by this crate.
///
/// I/O-Fehler werden als Nachricht zusammen mit der betroffenen Kategorie
/// bzw. dem Record transportiert (nie verschluckt); dadurch bleibt der Typ
/// `Clone + PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// No index file is registered for the requested category.
    CategoryNotFound(u8),
    /// The record id lies outside the index bounds, or its stored size is 0.
    RecordNotFound { category: u8, record: u32 },
    /// The data blob ended before the indexed byte range was fully read.
    ShortRead {
        category: u8,
        record: u32,
        expected: u32,
        got: u32,
    },
    /// Keine der bekannten Cache-Signaturen passt auf das Verzeichnis.
    NoCacheDetected,
    /// The winning cache layout needs a filesystem capability the current
    /// access layer does not provide. Names the missing capability.
    AmbiguousEnvironment(&'static str),
    /// The directory holds a recognized cache layout this crate has no
    /// loader for (modern SQLite cache, pre-index formats).
    UnsupportedLayout(&'static str),
    /// Reading an index file failed.
    IndexIo { category: u8, detail: String },
    /// Reading the data blob failed.
    BlobIo {
        category: u8,
        record: u32,
        detail: String,
    },
    /// Reading an opcode definition file failed.
    TableIo { detail: String },
    /// Der Instruktionsstrom endet mitten in einem Opcode oder Immediate.
    UnexpectedEof { offset: usize },
    /// A string immediate is not valid UTF-8.
    InvalidString { offset: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CategoryNotFound(category) => {
                write!(f, "no index file for category {category}")
            }
            Self::RecordNotFound { category, record } => {
                write!(f, "record {record} not found in category {category}")
            }
            Self::ShortRead {
                category,
                record,
                expected,
                got,
            } => write!(
                f,
                "short read for record {record} in category {category}: wanted {expected} bytes, got {got}"
            ),
            Self::NoCacheDetected => write!(f, "no cache layout detected in directory"),
            Self::AmbiguousEnvironment(capability) => {
                write!(f, "cache layout requires unavailable capability: {capability}")
            }
            Self::UnsupportedLayout(layout) => {
                write!(f, "unsupported cache layout: {layout}")
            }
            Self::IndexIo { category, detail } => {
                write!(f, "index read failed for category {category}: {detail}")
            }
            Self::BlobIo {
                category,
                record,
                detail,
            } => write!(
                f,
                "blob read failed for record {record} in category {category}: {detail}"
            ),
            Self::TableIo { detail } => {
                write!(f, "opcode table read failed: {detail}")
            }
            Self::UnexpectedEof { offset } => {
                write!(f, "instruction stream truncated at offset {offset}")
            }
            Self::InvalidString { offset } => {
                write!(f, "string immediate at offset {offset} is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Wrappt einen Index-I/O-Fehler mit der betroffenen Kategorie.
    pub fn index_io(category: u8, err: &std::io::Error) -> Self {
        Self::IndexIo {
            category,
            detail: err.to_string(),
        }
    }

    /// Wrappt einen Blob-I/O-Fehler mit Kategorie und Record.
    pub fn blob_io(category: u8, record: u32, err: &std::io::Error) -> Self {
        Self::BlobIo {
            category,
            record,
            detail: err.to_string(),
        }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
