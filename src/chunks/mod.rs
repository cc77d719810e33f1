pub mod level;
pub mod notes;
pub mod reader;
pub mod writer;

use crate::error::ProjectError;
use crate::ids::{self, ChunkId};
use bytes::{BufMut, Bytes, BytesMut};

/// Tag plus 32 bit size.
pub const HEADER_LEN: u64 = 8;

/// Magic, size and form type in front of the first chunk.
pub const ROOT_HEADER_LEN: u64 = 12;

/// Root size value meaning "read the real size from the ds64 chunk".
pub const SIZE_SENTINEL: u32 = 0xFFFF_FFFF;

/// Header of a chunk as found in (or destined for) the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: ChunkId,
    /// Declared payload size, without the pad byte.
    pub size: u64,
    /// Absolute offset of the header.
    pub start: u64,
}

impl ChunkHeader {
    pub fn payload_start(&self) -> u64 {
        self.start + HEADER_LEN
    }

    pub fn payload_end(&self) -> u64 {
        self.payload_start().saturating_add(self.size)
    }

    /// Where the following sibling's header starts, pad byte included.
    pub fn next_start(&self) -> u64 {
        self.payload_end().saturating_add(self.size & 1)
    }

    pub fn is_list(&self) -> bool {
        self.id == ids::LIST
    }
}

/// A payload with a fixed wire layout and a well known id.
pub trait Chunk: Sized {
    const ID: ChunkId;

    fn parse(payload: &Bytes) -> Result<Self, ProjectError>;

    fn encode(&self, out: &mut BytesMut);

    fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.encode(&mut out);
        out.freeze()
    }
}

/// Copies the first `N` bytes of a payload. Extra bytes are ignored.
fn fixed<const N: usize>(
    id: ChunkId,
    payload: &Bytes,
) -> Result<[u8; N], ProjectError> {
    if payload.len() < N {
        return Err(ProjectError::PayloadTooShort {
            id,
            expected: N,
            actual: payload.len(),
        });
    }
    if payload.len() > N {
        log::debug!("{} chunk has {} extra byte(s)", id, payload.len() - N);
    }

    let mut out = [0; N];
    out.copy_from_slice(&payload[..N]);
    Ok(out)
}

/// `ver ` - branch identifier and format version, checked before anything
/// else in the file is trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionChunk {
    pub branch: [u8; 8],
    pub version: u32,
}

impl Chunk for VersionChunk {
    const ID: ChunkId = ids::VERSION;

    fn parse(payload: &Bytes) -> Result<VersionChunk, ProjectError> {
        let raw: [u8; 12] = fixed(Self::ID, payload)?;
        let mut branch = [0; 8];
        branch.copy_from_slice(&raw[..8]);
        let version = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);
        Ok(VersionChunk { branch, version })
    }

    fn encode(&self, out: &mut BytesMut) {
        out.put_slice(&self.branch);
        out.put_u32_le(self.version);
    }
}

/// `effc` - effect column count for each of the 8 channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectColumns(pub [u8; 8]);

impl Chunk for EffectColumns {
    const ID: ChunkId = ids::EFFECT_COLUMNS;

    fn parse(payload: &Bytes) -> Result<EffectColumns, ProjectError> {
        Ok(EffectColumns(fixed(Self::ID, payload)?))
    }

    fn encode(&self, out: &mut BytesMut) {
        out.put_slice(&self.0);
    }
}

/// `col ` - RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Chunk for Color {
    const ID: ChunkId = ids::COLOR;

    fn parse(payload: &Bytes) -> Result<Color, ProjectError> {
        Ok(Color(fixed(Self::ID, payload)?))
    }

    fn encode(&self, out: &mut BytesMut) {
        out.put_slice(&self.0);
    }
}

/// `idx ` - fixed pattern index table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternIndex(pub [u8; 16]);

impl Chunk for PatternIndex {
    const ID: ChunkId = ids::PATTERN_INDEX;

    fn parse(payload: &Bytes) -> Result<PatternIndex, ProjectError> {
        Ok(PatternIndex(fixed(Self::ID, payload)?))
    }

    fn encode(&self, out: &mut BytesMut) {
        out.put_slice(&self.0);
    }
}
