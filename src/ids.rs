use std::fmt;

/// A four character code identifying a chunk or a list type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub [u8; 4]);

impl ChunkId {
    pub const fn new(bytes: &[u8; 4]) -> ChunkId {
        ChunkId(*bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Every byte must be printable ASCII (0x20..=0x7E).
    pub fn is_printable(&self) -> bool {
        self.0.iter().all(|b| (0x20..=0x7E).contains(b))
    }
}

impl From<[u8; 4]> for ChunkId {
    fn from(bytes: [u8; 4]) -> ChunkId {
        ChunkId(bytes)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if (0x20..=0x7E).contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId(\"{}\")", self)
    }
}

// container
pub const RIFF: ChunkId = ChunkId::new(b"RIFF");
pub const RF64: ChunkId = ChunkId::new(b"RF64");
pub const DS64: ChunkId = ChunkId::new(b"ds64"); // 64 bit size extension
pub const LIST: ChunkId = ChunkId::new(b"LIST");

// form type of a project file
pub const PROJECT: ChunkId = ChunkId::new(b"CTRK");
pub const VERSION: ChunkId = ChunkId::new(b"ver ");

// list types
pub const INFO: ChunkId = ChunkId::new(b"INFO");
pub const SONG: ChunkId = ChunkId::new(b"song");
pub const PATTERN: ChunkId = ChunkId::new(b"pat ");
pub const INSTRUMENT: ChunkId = ChunkId::new(b"inst");

// INFO
pub const ARTIST: ChunkId = ChunkId::new(b"IART");
pub const COMMENTS: ChunkId = ChunkId::new(b"ICMT");
pub const COPYRIGHT: ChunkId = ChunkId::new(b"ICOP");
pub const CREATED: ChunkId = ChunkId::new(b"ICRD");
pub const NAME: ChunkId = ChunkId::new(b"INAM");
pub const SOFTWARE: ChunkId = ChunkId::new(b"ISFT");

// song / pattern
pub const EFFECT_COLUMNS: ChunkId = ChunkId::new(b"effc");
pub const COLOR: ChunkId = ChunkId::new(b"col ");
pub const PATTERN_INDEX: ChunkId = ChunkId::new(b"idx ");
pub const BEATS_MAJOR: ChunkId = ChunkId::new(b"bmaj");
pub const BEATS_MINOR: ChunkId = ChunkId::new(b"bmin");
pub const NOTES: ChunkId = ChunkId::new(b"note");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_range() {
        assert!(ChunkId::new(b"col ").is_printable());
        assert!(ChunkId::new(b"~~~~").is_printable());
        assert!(!ChunkId::new(b"ab\x1fc").is_printable());
        assert!(!ChunkId::new(b"ab\x7fc").is_printable());
    }

    #[test]
    fn display_escapes_unprintable_bytes() {
        assert_eq!(ChunkId::new(b"ver ").to_string(), "ver ");
        assert_eq!(ChunkId([b'a', 0, b'b', 0xff]).to_string(), "a\\x00b\\xff");
    }
}
