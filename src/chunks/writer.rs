use super::level::{Level, LevelStack};
use super::{HEADER_LEN, ROOT_HEADER_LEN, SIZE_SENTINEL};
use crate::error::ChunkError;
use crate::ids::{self, ChunkId};
use std::convert::TryFrom;
use std::io::{Seek, SeekFrom, Write};

/// A chunk whose header hole has been reserved but not filled in yet.
#[derive(Clone, Copy, Debug)]
struct OpenChunk {
    start: u64,
    size: u64,
}

/// Builds a RIFF container incrementally.
///
/// Sizes aren't known until a payload is complete, so every header is
/// written as a placeholder and patched once its chunk or list is finished.
/// The root size goes in last, in `finish`.
pub struct ChunkWriter<W: Write + Seek> {
    out: W,
    root: Level,
    /// Offset of the ds64 payload when writing an RF64 file.
    ds64: Option<u64>,
    levels: LevelStack,
    chunk: Option<OpenChunk>,
    pos: u64,
}

impl<W: Write + Seek> ChunkWriter<W> {
    /// Starts a `RIFF` container of the given form type at the sink's
    /// current position.
    pub fn new(out: W, form: ChunkId) -> Result<ChunkWriter<W>, ChunkError> {
        ChunkWriter::start(out, form, false)
    }

    /// Starts an `RF64` container with room for a 64 bit size.
    pub fn new_large(
        out: W,
        form: ChunkId,
    ) -> Result<ChunkWriter<W>, ChunkError> {
        ChunkWriter::start(out, form, true)
    }

    fn start(
        mut out: W,
        form: ChunkId,
        large: bool,
    ) -> Result<ChunkWriter<W>, ChunkError> {
        check_id(&form, 8)?;
        let start = out.seek(SeekFrom::Current(0))?;

        let (magic, size) = if large {
            (ids::RF64, SIZE_SENTINEL)
        } else {
            (ids::RIFF, 0)
        };
        out.write_all(magic.as_bytes())?;
        out.write_all(&size.to_le_bytes())?;
        out.write_all(form.as_bytes())?;

        let mut pos = start + ROOT_HEADER_LEN;
        let ds64 = if large {
            out.write_all(ids::DS64.as_bytes())?;
            out.write_all(&8u32.to_le_bytes())?;
            out.write_all(&[0; 8])?;
            pos += HEADER_LEN;
            let payload = pos;
            pos += 8;
            Some(payload)
        } else {
            None
        };

        Ok(ChunkWriter {
            out,
            root: Level {
                start,
                id: magic,
                size: 0,
                list_type: form,
            },
            ds64,
            levels: LevelStack::new(),
            chunk: None,
            pos,
        })
    }

    /// Number of open lists.
    pub fn depth(&self) -> usize {
        self.levels.depth()
    }

    pub fn in_chunk(&self) -> bool {
        self.chunk.is_some()
    }

    /// Reserves a header for a new chunk. Its id is given to `finish_chunk`.
    pub fn begin_chunk(&mut self) -> Result<(), ChunkError> {
        self.not_in_chunk("begin_chunk")?;
        self.out.write_all(&[0; 8])?;
        self.chunk = Some(OpenChunk {
            start: self.pos,
            size: 0,
        });
        self.pos += HEADER_LEN;
        Ok(())
    }

    /// Appends to the open chunk's payload.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ChunkError> {
        let chunk = self.chunk.as_mut().ok_or(ChunkError::ChunkState {
            operation: "write",
            state: "no chunk is open",
        })?;

        let size = chunk.size + data.len() as u64;
        if size > u64::from(u32::MAX) {
            return Err(ChunkError::ChunkTooLarge { size });
        }
        self.out.write_all(data)?;
        chunk.size = size;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Patches the open chunk's header and pads it to an even length.
    pub fn finish_chunk(&mut self, id: ChunkId) -> Result<(), ChunkError> {
        let chunk = self.chunk.ok_or(ChunkError::ChunkState {
            operation: "finish_chunk",
            state: "no chunk is open",
        })?;
        check_id(&id, chunk.start)?;

        self.out.seek(SeekFrom::Start(chunk.start))?;
        self.out.write_all(id.as_bytes())?;
        self.out.write_all(&(chunk.size as u32).to_le_bytes())?;
        self.out.seek(SeekFrom::Start(self.pos))?;
        if chunk.size % 2 == 1 {
            self.out.write_all(&[0])?;
            self.pos += 1;
        }

        self.chunk = None;
        log::debug!("wrote chunk {} at {}, {} byte(s)", id, chunk.start, chunk.size);
        Ok(())
    }

    /// Writes a complete chunk in one go.
    pub fn write_chunk(
        &mut self,
        id: ChunkId,
        data: &[u8],
    ) -> Result<(), ChunkError> {
        self.begin_chunk()?;
        self.write(data)?;
        self.finish_chunk(id)
    }

    /// Opens a `LIST` of the given type. Chunks written until the matching
    /// `finish_list` become its children.
    pub fn begin_list(&mut self, list_type: ChunkId) -> Result<(), ChunkError> {
        self.not_in_chunk("begin_list")?;
        check_id(&list_type, self.pos + HEADER_LEN)?;

        self.out.write_all(ids::LIST.as_bytes())?;
        self.out.write_all(&0u32.to_le_bytes())?;
        self.out.write_all(list_type.as_bytes())?;
        self.levels.push(Level {
            start: self.pos,
            id: ids::LIST,
            size: 0,
            list_type,
        });
        self.pos += HEADER_LEN + 4;
        Ok(())
    }

    /// Patches the innermost list's header and closes it.
    pub fn finish_list(&mut self) -> Result<(), ChunkError> {
        self.not_in_chunk("finish_list")?;
        let level = self.levels.pop().ok_or(ChunkError::ChunkState {
            operation: "finish_list",
            state: "no list is open",
        })?;

        let size = self.pos - level.payload_start();
        let size32 = u32::try_from(size)
            .map_err(|_| ChunkError::ChunkTooLarge { size })?;
        self.out.seek(SeekFrom::Start(level.start))?;
        self.out.write_all(level.id.as_bytes())?;
        self.out.write_all(&size32.to_le_bytes())?;
        self.out.write_all(level.list_type.as_bytes())?;
        self.out.seek(SeekFrom::Start(self.pos))?;

        log::debug!(
            "wrote list {} at {}, {} byte(s)",
            level.list_type,
            level.start,
            size
        );
        Ok(())
    }

    /// Writes the root size and hands the sink back, positioned after the
    /// container.
    pub fn finish(mut self) -> Result<W, ChunkError> {
        self.not_in_chunk("finish")?;
        if !self.levels.is_empty() {
            return Err(ChunkError::ChunkState {
                operation: "finish",
                state: "a list is still open",
            });
        }

        let size = self.pos - self.root.payload_start();
        match self.ds64 {
            Some(payload) => {
                self.out.seek(SeekFrom::Start(payload))?;
                self.out.write_all(&size.to_le_bytes())?;
            }
            None => {
                let size32 = u32::try_from(size)
                    .ok()
                    .filter(|&s| s != SIZE_SENTINEL)
                    .ok_or(ChunkError::SizeOverflow { size })?;
                self.out.seek(SeekFrom::Start(self.root.start + 4))?;
                self.out.write_all(&size32.to_le_bytes())?;
            }
        }
        self.out.seek(SeekFrom::Start(self.pos))?;
        self.out.flush()?;

        log::debug!("finished {} container, {} byte(s)", self.root.id, size + 8);
        Ok(self.out)
    }

    fn not_in_chunk(&self, operation: &'static str) -> Result<(), ChunkError> {
        if self.chunk.is_some() {
            return Err(ChunkError::ChunkState {
                operation,
                state: "a chunk is open",
            });
        }
        Ok(())
    }
}

fn check_id(id: &ChunkId, offset: u64) -> Result<(), ChunkError> {
    if !id.is_printable() {
        return Err(ChunkError::InvalidId { offset, id: *id });
    }
    Ok(())
}
