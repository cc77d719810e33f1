use crate::ids::ChunkId;
use std::io;
use thiserror::Error;

/// Structural errors raised by the chunk container engine.
///
/// Offsets are absolute byte positions in the underlying stream.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid file magic {found}")]
    InvalidMagic { found: ChunkId },

    #[error("invalid chunk id {id} at offset {offset}")]
    InvalidId { offset: u64, id: ChunkId },

    #[error(
        "unexpected end of data at offset {offset}: needed {needed} byte(s), \
         {available} available"
    )]
    UnexpectedEnd {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("declared file size {declared} does not match actual size {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error(
        "chunk {id} at offset {offset} declares {size} byte(s) but only \
         {available} fit in the enclosing level"
    )]
    SizeExceedsBound {
        offset: u64,
        id: ChunkId,
        size: u64,
        available: u64,
    },

    #[error(
        "chunk {id} at offset {offset} ends at {end}, past the end of the \
         file ({file_size})"
    )]
    SizeExceedsFile {
        offset: u64,
        id: ChunkId,
        end: u64,
        file_size: u64,
    },

    #[error("size sentinel present but no ds64 chunk at offset {offset}")]
    MissingSizeExtension { offset: u64 },

    #[error("chunk {id} at offset {offset} is not a list")]
    NotAList { offset: u64, id: ChunkId },

    #[error("list at offset {offset} is too small ({size} byte(s))")]
    ListTooSmall { offset: u64, size: u64 },

    #[error("not inside a list")]
    NotInList,

    #[error("no current chunk (end of level)")]
    NoCurrentChunk,

    #[error("negative seek offset {0}")]
    NegativeSeek(i64),

    #[error("{operation} called while {state}")]
    ChunkState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("chunk payload of {size} byte(s) does not fit a 32 bit size")]
    ChunkTooLarge { size: u64 },

    #[error("file of {size} byte(s) needs a ds64 size extension")]
    SizeOverflow { size: u64 },
}

/// Errors raised while decoding a note stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("record {record}: note value {value} out of range")]
    NoteOutOfRange { record: usize, value: u8 },

    #[error("record {record}: effect columns are not supported")]
    EffectsUnsupported { record: usize },
}

/// A value too large for the var16 encoding.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("value {0} does not fit in a var16 field")]
pub struct Var16Overflow(pub u16);

/// Errors raised while loading or saving a whole project.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Notes(#[from] NoteError),

    #[error("not a project file (form type {0})")]
    InvalidForm(ChunkId),

    #[error("unknown format branch {0:?}")]
    UnknownBranch([u8; 8]),

    #[error("format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("file has no version chunk")]
    MissingVersion,

    #[error("{id} chunk holds {actual} byte(s), expected {expected}")]
    PayloadTooShort {
        id: ChunkId,
        expected: usize,
        actual: usize,
    },
}

impl From<io::Error> for ProjectError {
    fn from(e: io::Error) -> ProjectError {
        ProjectError::Chunk(ChunkError::Io(e))
    }
}
