//! In-memory project graph, as far as the file format is concerned.
//!
//! Names and metadata are kept as raw bytes; this crate never interprets
//! them.

use bytes::Bytes;

pub use crate::chunks::notes::{Cell, Note};

/// Channels per song. One effect column count is stored for each.
pub const CHANNELS: usize = 8;

/// Stands in for newlines inside a stored `ICMT` chunk.
pub const COMMENT_NEWLINE: u8 = 0x1E;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Project {
    pub info: Info,
    pub songs: Vec<Song>,
    pub instruments: Vec<Instrument>,
}

/// `INFO` list contents. Empty fields aren't written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Info {
    pub artist: Bytes,
    /// Newlines are plain `\n` here.
    pub comments: Bytes,
    pub copyright: Bytes,
    pub created: Bytes,
    pub name: Bytes,
    /// Signature of the software that wrote the file. Replaced with ours on
    /// save.
    pub software: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Song {
    pub name: Bytes,
    pub color: Option<[u8; 3]>,
    pub effect_columns: [u8; CHANNELS],
    pub patterns: Vec<Pattern>,
}

impl Default for Song {
    fn default() -> Song {
        Song {
            name: Bytes::new(),
            color: None,
            effect_columns: [1; CHANNELS],
            patterns: vec![],
        }
    }
}

impl Song {
    pub fn new(name: &str) -> Song {
        Song {
            name: Bytes::copy_from_slice(name.as_bytes()),
            ..Song::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    /// Raw `idx ` table.
    pub index: [u8; 16],
    pub beats_major: Bytes,
    pub beats_minor: Bytes,
    /// One cell sequence per `note` chunk, in file order.
    pub tracks: Vec<Vec<Cell>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instrument {
    pub name: Bytes,
}

impl Instrument {
    pub fn new(name: &str) -> Instrument {
        Instrument {
            name: Bytes::copy_from_slice(name.as_bytes()),
        }
    }
}

/// `\n` to the stored separator.
pub fn store_comments(comments: &[u8]) -> Vec<u8> {
    comments
        .iter()
        .map(|&b| if b == b'\n' { COMMENT_NEWLINE } else { b })
        .collect()
}

/// Stored separator back to `\n`.
pub fn load_comments(stored: &[u8]) -> Vec<u8> {
    stored
        .iter()
        .map(|&b| if b == COMMENT_NEWLINE { b'\n' } else { b })
        .collect()
}
