//! Tracker projects stored as RIFF chunk containers.
//!
//! `chunks` holds the container engine (`ChunkReader`, `ChunkWriter`) and the
//! packed note stream codec; `reader` and `writer` map whole projects onto
//! it.

extern crate bytes;
extern crate log;
extern crate seek_bufread;

pub mod chunks;
pub mod error;
pub mod ids;
pub mod project;
pub mod reader;
pub mod var16;
pub mod writer;

pub use chunks::notes::{decode_notes, encode_notes};
pub use chunks::reader::{ChunkReader, Deviation};
pub use chunks::writer::ChunkWriter;
pub use chunks::ChunkHeader;
pub use error::{ChunkError, NoteError, ProjectError, Var16Overflow};
pub use ids::ChunkId;
pub use project::{Cell, Info, Instrument, Note, Pattern, Project, Song};
pub use reader::{load_project, ProjectReader, Warning};
pub use writer::{save_project, ProjectWriter};

/// Branch identifier stored in the `ver ` chunk.
pub const BRANCH: [u8; 8] = *b"chunktrk";

/// Newest format version this crate reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

/// Stored in `ISFT`. Files signed differently load with a warning.
pub fn software_signature() -> String {
    format!("chunktrack {}", env!("CARGO_PKG_VERSION"))
}
