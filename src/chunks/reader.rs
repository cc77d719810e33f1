use super::level::{Level, LevelStack};
use super::{ChunkHeader, HEADER_LEN, ROOT_HEADER_LEN, SIZE_SENTINEL};
use crate::error::ChunkError;
use crate::ids::{self, ChunkId};
use bytes::Bytes;
use seek_bufread::BufReader;
use std::cmp;
use std::convert::TryFrom;
use std::io::{self, Read, Seek, SeekFrom};

/// Something off about the file that doesn't stop traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deviation {
    /// 1-7 bytes at the end of a level, too few to hold another header.
    ExcessBytes { offset: u64, count: u64 },
    /// Stream data after the end of the root chunk.
    TrailingData { offset: u64, count: u64 },
}

/// Walks a RIFF container one chunk at a time.
///
/// Every header is checked against the level it lives in and against the
/// end of the file before anything is read from its payload, so a corrupt
/// size field can't send a read past the data.
pub struct ChunkReader<S: Read + Seek> {
    buf: BufReader<S>,
    root: Level,
    /// Offset of the first level 0 header, after any ds64 chunk.
    first_chunk: u64,
    stream_end: u64,
    levels: LevelStack,
    current: Option<ChunkHeader>,
    /// Absolute position the next `read` starts at.
    cursor: u64,
    /// `current` hasn't been handed out by `next_chunk_id` yet
    fresh: bool,
    deviations: Vec<Deviation>,
}

impl<S: Read + Seek> ChunkReader<S> {
    /// Reads the root header at the stream's current position and positions
    /// the reader on the first chunk.
    ///
    /// `known_size` is the total size of the container (root header
    /// included) if the caller knows it; it must agree with the header.
    pub fn open(
        source: S,
        known_size: Option<u64>,
    ) -> Result<ChunkReader<S>, ChunkError> {
        let mut buf = BufReader::new(source);
        let start = buf.seek(SeekFrom::Current(0))?;
        let stream_end = buf.seek(SeekFrom::End(0))?;
        let available = stream_end.saturating_sub(start);

        if available < ROOT_HEADER_LEN {
            return Err(ChunkError::UnexpectedEnd {
                offset: start,
                needed: ROOT_HEADER_LEN,
                available,
            });
        }

        let mut header = [0; 12];
        read_at(&mut buf, stream_end, start, &mut header)?;

        let magic = id_from(&header[0..4]);
        if magic != ids::RIFF && magic != ids::RF64 {
            return Err(ChunkError::InvalidMagic { found: magic });
        }
        let raw_size =
            u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let form = id_from(&header[8..12]);

        let mut first_chunk = start + ROOT_HEADER_LEN;
        let size = if raw_size == SIZE_SENTINEL {
            let (size, next) =
                read_size_extension(&mut buf, stream_end, first_chunk)?;
            first_chunk = next;
            size
        } else {
            u64::from(raw_size)
        };

        let total = size.checked_add(HEADER_LEN).ok_or(
            ChunkError::UnexpectedEnd {
                offset: start,
                needed: u64::MAX,
                available,
            },
        )?;
        if let Some(known) = known_size {
            if known != total {
                return Err(ChunkError::SizeMismatch {
                    declared: total,
                    actual: known,
                });
            }
        }
        if total > available {
            return Err(ChunkError::UnexpectedEnd {
                offset: start,
                needed: total,
                available,
            });
        }
        if size < 4 {
            return Err(ChunkError::ListTooSmall {
                offset: start,
                size,
            });
        }

        let root = Level {
            start,
            id: magic,
            size,
            list_type: form,
        };
        if first_chunk > root.end() {
            return Err(ChunkError::SizeExceedsBound {
                offset: start + ROOT_HEADER_LEN,
                id: ids::DS64,
                size: first_chunk - start - ROOT_HEADER_LEN,
                available: size - 4,
            });
        }

        log::debug!(
            "opened {} container, form {}, {} byte(s)",
            magic,
            form,
            total
        );

        let mut reader = ChunkReader {
            buf,
            root,
            first_chunk,
            stream_end,
            levels: LevelStack::new(),
            current: None,
            cursor: first_chunk,
            fresh: true,
            deviations: vec![],
        };

        if available > total {
            reader.deviate(Deviation::TrailingData {
                offset: root.end(),
                count: available - total,
            });
        }

        reader.enter(first_chunk, root.end(), Entry::First)?;
        Ok(reader)
    }

    /// Form type of the root container.
    pub fn form_type(&self) -> ChunkId {
        self.root.list_type
    }

    /// Total container size, root header included.
    pub fn file_size(&self) -> u64 {
        self.root.size + HEADER_LEN
    }

    /// Number of lists currently descended into. 0 at the root.
    pub fn depth(&self) -> usize {
        self.levels.depth()
    }

    /// List type of the innermost open level (the form type at the root).
    pub fn list_type(&self) -> ChunkId {
        self.levels
            .top()
            .map(|level| level.list_type)
            .unwrap_or(self.root.list_type)
    }

    /// The chunk the reader is positioned on. `None` once a level is
    /// exhausted.
    pub fn current(&self) -> Option<&ChunkHeader> {
        self.current.as_ref()
    }

    /// Cursor offset relative to the current chunk's payload.
    pub fn position_in_chunk(&self) -> Option<u64> {
        self.current
            .map(|c| self.cursor.saturating_sub(c.payload_start()))
    }

    pub fn deviations(&self) -> &[Deviation] {
        &self.deviations
    }

    /// Hands over the deviations recorded so far.
    pub fn take_deviations(&mut self) -> Vec<Deviation> {
        std::mem::take(&mut self.deviations)
    }

    /// Reads up to `out.len()` bytes of the current chunk's payload, never
    /// past its declared end. Returns the number of bytes read, 0 at the end
    /// of the chunk.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, ChunkError> {
        let current = self.current.ok_or(ChunkError::NoCurrentChunk)?;
        let end = current.payload_end();
        if self.cursor >= end {
            return Ok(0);
        }

        let n = cmp::min(out.len() as u64, end - self.cursor) as usize;
        let cursor = self.cursor;
        read_at(&mut self.buf, self.stream_end, cursor, &mut out[..n])?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Moves the cursor to `offset` bytes into the current payload. Offsets
    /// past the end are allowed; reads there return nothing.
    pub fn seek_in_chunk(&mut self, offset: i64) -> Result<(), ChunkError> {
        let current = self.current.ok_or(ChunkError::NoCurrentChunk)?;
        if offset < 0 {
            return Err(ChunkError::NegativeSeek(offset));
        }
        self.cursor = current.payload_start().saturating_add(offset as u64);
        Ok(())
    }

    /// The whole payload of the current chunk, pad byte excluded.
    pub fn read_payload(&mut self) -> Result<Bytes, ChunkError> {
        let current = self.current.ok_or(ChunkError::NoCurrentChunk)?;
        let len = usize::try_from(current.size)
            .map_err(|_| ChunkError::ChunkTooLarge { size: current.size })?;

        self.cursor = current.payload_start();
        let mut data = vec![0; len];
        let mut filled = 0;
        while filled < len {
            match self.read(&mut data[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        data.truncate(filled);
        Ok(Bytes::from(data))
    }

    /// Moves to the chunk following the current one on the same level.
    /// Returns `None` at the end of the level.
    pub fn next_sibling(
        &mut self,
    ) -> Result<Option<ChunkHeader>, ChunkError> {
        let current = match self.current {
            Some(current) => current,
            None => return Ok(None),
        };

        let next = current.next_start();
        let end = self.level_end();
        self.enter(next, end, Entry::Sibling)
    }

    /// Iterator style walk over a level: the first call after opening,
    /// descending or rewinding yields the chunk the reader is already on,
    /// later calls advance.
    pub fn next_chunk_id(&mut self) -> Result<Option<ChunkId>, ChunkError> {
        if !self.fresh {
            self.next_sibling()?;
        }
        self.fresh = false;
        Ok(self.current.map(|c| c.id))
    }

    /// Enters the current `LIST` chunk and positions the reader on its first
    /// child. Returns the list type.
    pub fn descend(&mut self) -> Result<ChunkId, ChunkError> {
        let current = self.current.ok_or(ChunkError::NoCurrentChunk)?;
        if !current.is_list() {
            return Err(ChunkError::NotAList {
                offset: current.start,
                id: current.id,
            });
        }
        if current.size < 4 {
            return Err(ChunkError::ListTooSmall {
                offset: current.start,
                size: current.size,
            });
        }

        let mut raw = [0; 4];
        let at = current.payload_start();
        read_at(&mut self.buf, self.stream_end, at, &mut raw)?;
        let list_type = ChunkId(raw);
        if !list_type.is_printable() {
            return Err(ChunkError::InvalidId {
                offset: current.payload_start(),
                id: list_type,
            });
        }

        let level = Level {
            start: current.start,
            id: current.id,
            size: current.size,
            list_type,
        };
        self.levels.push(level);
        log::debug!(
            "descend into {} at {} (depth {})",
            list_type,
            level.start,
            self.levels.depth()
        );

        self.enter(level.children_start(), level.end(), Entry::First)?;
        Ok(list_type)
    }

    /// Leaves the innermost list. The list becomes the current chunk again;
    /// the cursor stays where it is.
    pub fn ascend(&mut self) -> Result<(), ChunkError> {
        let level = self.levels.pop().ok_or(ChunkError::NotInList)?;
        self.current = Some(ChunkHeader {
            id: level.id,
            size: level.size,
            start: level.start,
        });
        self.fresh = false;
        Ok(())
    }

    /// Back to the first chunk of the root level.
    pub fn rewind(&mut self) -> Result<(), ChunkError> {
        self.levels.clear();
        let first = self.first_chunk;
        let end = self.root.end();
        self.enter(first, end, Entry::First)?;
        Ok(())
    }

    fn level_end(&self) -> u64 {
        self.levels
            .top()
            .map(Level::end)
            .unwrap_or_else(|| self.root.end())
    }

    fn file_end(&self) -> u64 {
        self.root.end()
    }

    fn deviate(&mut self, deviation: Deviation) {
        log::warn!("{:?}", deviation);
        self.deviations.push(deviation);
    }

    /// Makes the header at `start` current. On failure the reader is left
    /// without a current chunk at this level.
    fn enter(
        &mut self,
        start: u64,
        level_end: u64,
        entry: Entry,
    ) -> Result<Option<ChunkHeader>, ChunkError> {
        self.current = None;
        self.fresh = true;
        self.cursor = cmp::min(start, level_end);

        let header = self.read_header(start, level_end, entry)?;
        if let Some(header) = header {
            self.current = Some(header);
            self.cursor = header.payload_start();
        }
        Ok(header)
    }

    fn read_header(
        &mut self,
        start: u64,
        level_end: u64,
        entry: Entry,
    ) -> Result<Option<ChunkHeader>, ChunkError> {
        if start >= level_end {
            return Ok(None);
        }

        let room = level_end - start;
        if room < HEADER_LEN {
            if entry == Entry::First {
                return Err(self.overrun_header(start)?);
            }
            self.deviate(Deviation::ExcessBytes {
                offset: start,
                count: room,
            });
            return Ok(None);
        }

        let mut raw = [0; 8];
        read_at(&mut self.buf, self.stream_end, start, &mut raw)?;

        let id = id_from(&raw[0..4]);
        if !id.is_printable() {
            return Err(ChunkError::InvalidId { offset: start, id });
        }

        let size =
            u64::from(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]));
        let available = room - HEADER_LEN;
        if size > available {
            return Err(ChunkError::SizeExceedsBound {
                offset: start,
                id,
                size,
                available,
            });
        }

        let header = ChunkHeader { id, size, start };
        if header.payload_end() > self.file_end() {
            return Err(ChunkError::SizeExceedsFile {
                offset: start,
                id,
                end: header.payload_end(),
                file_size: self.file_end(),
            });
        }

        log::debug!("chunk {} at {}, {} byte(s)", id, start, size);
        Ok(Some(header))
    }

    /// Error for a first chunk whose header runs past its level. Header
    /// bytes beyond the end of the stream read as zero.
    fn overrun_header(&mut self, start: u64) -> Result<ChunkError, ChunkError> {
        let mut raw = [0; 8];
        let n = cmp::min(HEADER_LEN, self.stream_end.saturating_sub(start));
        let stream_end = self.stream_end;
        read_at(&mut self.buf, stream_end, start, &mut raw[..n as usize])?;

        let size = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Ok(ChunkError::SizeExceedsBound {
            offset: start,
            id: id_from(&raw[0..4]),
            size: u64::from(size),
            available: 0,
        })
    }
}

/// How a header is reached. Only a sibling may be replaced by a few stray
/// bytes at the end of its level; the first chunk of a level must fit.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Entry {
    First,
    Sibling,
}

fn id_from(bytes: &[u8]) -> ChunkId {
    let mut id = [0; 4];
    id.copy_from_slice(&bytes[..4]);
    ChunkId(id)
}

/// Reads the ds64 chunk at `start`. Returns the real root size and the
/// offset of the chunk after it.
fn read_size_extension<S: Read + Seek>(
    buf: &mut BufReader<S>,
    stream_end: u64,
    start: u64,
) -> Result<(u64, u64), ChunkError> {
    let mut raw = [0; 16];
    read_at(buf, stream_end, start, &mut raw)?;

    let header = ChunkHeader {
        id: id_from(&raw[0..4]),
        size: u64::from(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]])),
        start,
    };
    if header.id != ids::DS64 || header.size < 8 {
        return Err(ChunkError::MissingSizeExtension { offset: start });
    }

    let mut size = [0; 8];
    size.copy_from_slice(&raw[8..16]);
    Ok((u64::from_le_bytes(size), header.next_start()))
}

fn read_at<S: Read + Seek>(
    buf: &mut BufReader<S>,
    stream_end: u64,
    offset: u64,
    out: &mut [u8],
) -> Result<(), ChunkError> {
    let needed = out.len() as u64;
    let available = stream_end.saturating_sub(offset);
    if needed > available {
        return Err(ChunkError::UnexpectedEnd {
            offset,
            needed,
            available,
        });
    }

    buf.seek(SeekFrom::Start(offset))?;
    buf.read_exact(out).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ChunkError::UnexpectedEnd {
            offset,
            needed,
            available,
        },
        _ => ChunkError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::writer::ChunkWriter;
    use std::io::Cursor;

    fn build<F>(body: F) -> Vec<u8>
    where
        F: FnOnce(&mut ChunkWriter<Cursor<Vec<u8>>>),
    {
        let mut w =
            ChunkWriter::new(Cursor::new(vec![]), ids::PROJECT).unwrap();
        body(&mut w);
        w.finish().unwrap().into_inner()
    }

    fn open(data: Vec<u8>) -> Result<ChunkReader<Cursor<Vec<u8>>>, ChunkError> {
        ChunkReader::open(Cursor::new(data), None)
    }

    fn song_with_pattern() -> Vec<u8> {
        build(|w| {
            w.begin_list(ids::SONG).unwrap();
            w.write_chunk(ids::NAME, b"x").unwrap();
            w.begin_list(ids::PATTERN).unwrap();
            w.finish_list().unwrap();
            w.finish_list().unwrap();
        })
    }

    #[test]
    fn open_positions_on_first_chunk() {
        let data = build(|w| w.write_chunk(ids::NAME, b"abcd").unwrap());
        let len = data.len() as u64;
        let reader = open(data).unwrap();

        assert_eq!(reader.form_type(), ids::PROJECT);
        assert_eq!(reader.file_size(), len);
        assert_eq!(reader.depth(), 0);
        let current = reader.current().unwrap();
        assert_eq!(current.id, ids::NAME);
        assert_eq!(current.size, 4);
        assert_eq!(current.start, 12);
        assert!(reader.deviations().is_empty());
    }

    #[test]
    fn bad_magic() {
        let mut data = build(|_| {});
        data[0..4].copy_from_slice(b"FORM");
        assert!(matches!(
            open(data),
            Err(ChunkError::InvalidMagic { found }) if found == ChunkId(*b"FORM")
        ));
    }

    #[test]
    fn root_larger_than_stream() {
        let mut data = build(|w| w.write_chunk(ids::NAME, b"ab").unwrap());
        data.pop();
        assert!(matches!(
            open(data),
            Err(ChunkError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn short_stream() {
        assert!(matches!(
            open(b"RIFF\x04\x00".to_vec()),
            Err(ChunkError::UnexpectedEnd { needed: 12, available: 6, .. })
        ));
    }

    #[test]
    fn known_size_must_match() {
        let data = build(|w| w.write_chunk(ids::NAME, b"ab").unwrap());
        let len = data.len() as u64;

        assert!(ChunkReader::open(Cursor::new(data.clone()), Some(len)).is_ok());
        assert!(matches!(
            ChunkReader::open(Cursor::new(data), Some(len + 2)),
            Err(ChunkError::SizeMismatch { declared, actual })
                if declared == len && actual == len + 2
        ));
    }

    #[test]
    fn child_larger_than_list() {
        let mut data = b"RIFF\x1a\x00\x00\x00CTRK".to_vec();
        data.extend_from_slice(b"LIST\x0e\x00\x00\x00test");
        data.extend_from_slice(b"abcd\x14\x00\x00\x00\x01\x02");

        let mut reader = open(data).unwrap();
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::LIST));
        assert!(matches!(
            reader.descend(),
            Err(ChunkError::SizeExceedsBound {
                offset: 24,
                size: 20,
                available: 2,
                ..
            })
        ));
        assert!(reader.current().is_none());
    }

    #[test]
    fn chunk_larger_than_root() {
        let mut data = b"RIFF\x0e\x00\x00\x00CTRK".to_vec();
        data.extend_from_slice(b"abcd\x20\x00\x00\x00\x01\x02");
        assert!(matches!(
            open(data),
            Err(ChunkError::SizeExceedsBound { offset: 12, .. })
        ));
    }

    #[test]
    fn unprintable_id() {
        let mut data = b"RIFF\x0e\x00\x00\x00CTRK".to_vec();
        data.extend_from_slice(b"ab\x00d\x02\x00\x00\x00\x01\x02");
        assert!(matches!(
            open(data),
            Err(ChunkError::InvalidId { offset: 12, .. })
        ));
    }

    #[test]
    fn excess_bytes_end_the_level() {
        let mut data = b"RIFF\x11\x00\x00\x00CTRK".to_vec();
        data.extend_from_slice(b"INAM\x02\x00\x00\x00ab\x00\x00\x00");
        let mut reader = open(data).unwrap();

        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::NAME));
        assert!(reader.deviations().is_empty());
        assert_eq!(reader.next_chunk_id().unwrap(), None);
        assert_eq!(
            reader.deviations(),
            &[Deviation::ExcessBytes {
                offset: 22,
                count: 3
            }]
        );
    }

    #[test]
    fn first_chunk_must_fit() {
        let data = b"RIFF\x07\x00\x00\x00CTRKabc".to_vec();
        assert!(matches!(
            open(data),
            Err(ChunkError::SizeExceedsBound { offset: 12, .. })
        ));
    }

    #[test]
    fn child_header_overruns_list() {
        // the list holds its type and 6 bytes, the child declares 20
        let mut data = b"RIFF\x16\x00\x00\x00CTRK".to_vec();
        data.extend_from_slice(b"LIST\x0a\x00\x00\x00test");
        data.extend_from_slice(b"abcd\x14\x00\x00\x00");

        let mut reader = open(data).unwrap();
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::LIST));
        assert!(matches!(
            reader.descend(),
            Err(ChunkError::SizeExceedsBound { offset: 24, id, size: 20, .. })
                if id == ChunkId(*b"abcd")
        ));
        assert!(reader.current().is_none());
        assert!(!reader
            .deviations()
            .iter()
            .any(|d| matches!(d, Deviation::ExcessBytes { .. })));
    }

    #[test]
    fn trailing_data() {
        let mut data = build(|w| w.write_chunk(ids::NAME, b"ab").unwrap());
        let len = data.len() as u64;
        data.extend_from_slice(&[1, 2, 3]);

        let mut reader = open(data).unwrap();
        assert_eq!(
            reader.take_deviations(),
            vec![Deviation::TrailingData {
                offset: len,
                count: 3
            }]
        );
        assert!(reader.deviations().is_empty());
    }

    #[test]
    fn walk_skips_pad_bytes() {
        let data = build(|w| {
            w.write_chunk(ids::COLOR, &[1, 2, 3]).unwrap();
            w.write_chunk(ids::NAME, b"ab").unwrap();
        });
        let mut reader = open(data).unwrap();

        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::COLOR));
        assert_eq!(&reader.read_payload().unwrap()[..], &[1, 2, 3]);
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::NAME));
        assert_eq!(reader.current().unwrap().start, 24);
        assert_eq!(&reader.read_payload().unwrap()[..], b"ab");
        assert_eq!(reader.next_chunk_id().unwrap(), None);
        assert_eq!(reader.next_chunk_id().unwrap(), None);
    }

    #[test]
    fn descend_and_ascend() {
        let mut reader = open(song_with_pattern()).unwrap();

        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::LIST));
        let song = *reader.current().unwrap();
        assert_eq!(reader.descend().unwrap(), ids::SONG);
        assert_eq!(reader.depth(), 1);
        assert_eq!(reader.list_type(), ids::SONG);

        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::NAME));
        assert_eq!(&reader.read_payload().unwrap()[..], b"x");
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::LIST));
        let pattern = *reader.current().unwrap();
        assert_eq!(reader.descend().unwrap(), ids::PATTERN);
        assert_eq!(reader.depth(), 2);
        assert_eq!(reader.next_chunk_id().unwrap(), None);

        reader.ascend().unwrap();
        assert_eq!(reader.depth(), 1);
        assert_eq!(reader.current(), Some(&pattern));
        assert_eq!(pattern.size, 4);
        assert_eq!(reader.next_chunk_id().unwrap(), None);

        reader.ascend().unwrap();
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.list_type(), ids::PROJECT);
        assert_eq!(reader.current(), Some(&song));
        assert_eq!(song.start, 12);
        assert_eq!(song.size, 26);
        assert_eq!(reader.next_chunk_id().unwrap(), None);

        assert!(matches!(reader.ascend(), Err(ChunkError::NotInList)));
    }

    #[test]
    fn ascend_keeps_the_cursor() {
        let mut reader = open(song_with_pattern()).unwrap();
        reader.next_chunk_id().unwrap();
        reader.descend().unwrap();
        reader.next_chunk_id().unwrap();

        // INAM payload starts at 32
        let mut byte = [0; 1];
        assert_eq!(reader.read(&mut byte).unwrap(), 1);
        assert_eq!(reader.position_in_chunk(), Some(1));

        reader.ascend().unwrap();
        // same absolute offset 33, now relative to the song payload at 20
        assert_eq!(reader.position_in_chunk(), Some(13));
    }

    #[test]
    fn rewind_restarts_at_root() {
        let mut reader = open(song_with_pattern()).unwrap();
        reader.next_chunk_id().unwrap();
        reader.descend().unwrap();
        reader.next_chunk_id().unwrap();

        reader.rewind().unwrap();
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::LIST));
        assert_eq!(reader.descend().unwrap(), ids::SONG);
    }

    #[test]
    fn descend_needs_a_list() {
        let data = build(|w| w.write_chunk(ids::NAME, b"ab").unwrap());
        let mut reader = open(data).unwrap();
        assert!(matches!(
            reader.descend(),
            Err(ChunkError::NotAList { offset: 12, .. })
        ));
    }

    #[test]
    fn reads_stay_inside_the_chunk() {
        let data = build(|w| {
            w.write_chunk(ids::NAME, b"abcd").unwrap();
            w.write_chunk(ids::ARTIST, b"efgh").unwrap();
        });
        let mut reader = open(data).unwrap();
        let mut out = [0; 16];

        assert_eq!(reader.read(&mut out).unwrap(), 4);
        assert_eq!(&out[..4], b"abcd");
        assert_eq!(reader.read(&mut out).unwrap(), 0);
        assert_eq!(reader.position_in_chunk(), Some(4));

        reader.seek_in_chunk(2).unwrap();
        assert_eq!(reader.read(&mut out).unwrap(), 2);
        assert_eq!(&out[..2], b"cd");

        reader.seek_in_chunk(100).unwrap();
        assert_eq!(reader.read(&mut out).unwrap(), 0);
        assert!(matches!(
            reader.seek_in_chunk(-1),
            Err(ChunkError::NegativeSeek(-1))
        ));

        reader.next_chunk_id().unwrap();
        assert_eq!(&reader.read_payload().unwrap()[..], b"efgh");
    }

    #[test]
    fn no_current_chunk_at_end() {
        let mut reader = open(build(|_| {})).unwrap();
        assert_eq!(reader.next_chunk_id().unwrap(), None);
        assert!(matches!(
            reader.read(&mut [0; 4]),
            Err(ChunkError::NoCurrentChunk)
        ));
        assert!(matches!(
            reader.read_payload(),
            Err(ChunkError::NoCurrentChunk)
        ));
    }

    #[test]
    fn large_container() {
        let mut w =
            ChunkWriter::new_large(Cursor::new(vec![]), ids::PROJECT).unwrap();
        w.write_chunk(ids::NAME, b"ab").unwrap();
        let data = w.finish().unwrap().into_inner();
        let len = data.len() as u64;

        let mut reader = open(data).unwrap();
        assert_eq!(reader.form_type(), ids::PROJECT);
        assert_eq!(reader.file_size(), len);
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::NAME));
        assert_eq!(&reader.read_payload().unwrap()[..], b"ab");
        assert_eq!(reader.next_chunk_id().unwrap(), None);

        reader.rewind().unwrap();
        assert_eq!(reader.next_chunk_id().unwrap(), Some(ids::NAME));
    }

    #[test]
    fn large_container_without_ds64() {
        let mut data = b"RF64\xff\xff\xff\xffCTRK".to_vec();
        data.extend_from_slice(b"INAM\x02\x00\x00\x00ab\x00\x00\x00\x00\x00\x00");
        assert!(matches!(
            open(data),
            Err(ChunkError::MissingSizeExtension { offset: 12 })
        ));
    }
}
