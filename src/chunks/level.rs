use super::HEADER_LEN;
use crate::ids::ChunkId;

/// One open list ancestor (or the root container).
///
/// `size` is the declared payload size, which includes the 4 byte list type.
/// While writing it stays 0 until the list is finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level {
    pub start: u64,
    pub id: ChunkId,
    pub size: u64,
    pub list_type: ChunkId,
}

impl Level {
    pub fn payload_start(&self) -> u64 {
        self.start + HEADER_LEN
    }

    /// Offset of the first child header, right after the list type.
    pub fn children_start(&self) -> u64 {
        self.payload_start() + 4
    }

    /// One past the last payload byte. Children never extend past this.
    pub fn end(&self) -> u64 {
        self.payload_start().saturating_add(self.size)
    }
}

#[derive(Debug, Default)]
pub struct LevelStack {
    levels: Vec<Level>,
}

impl LevelStack {
    pub fn new() -> LevelStack {
        LevelStack { levels: vec![] }
    }

    pub fn push(&mut self, level: Level) {
        self.levels.push(level);
    }

    pub fn pop(&mut self) -> Option<Level> {
        self.levels.pop()
    }

    pub fn top(&self) -> Option<&Level> {
        self.levels.last()
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }
}
