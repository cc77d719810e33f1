use crate::chunks::notes::encode_notes;
use crate::chunks::writer::ChunkWriter;
use crate::chunks::{Chunk, Color, EffectColumns, PatternIndex, VersionChunk};
use crate::error::ProjectError;
use crate::ids::{self, ChunkId};
use crate::project::{store_comments, Info, Instrument, Pattern, Project, Song};
use crate::{software_signature, BRANCH, FORMAT_VERSION};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

/// Saves a project as a chunk container.
pub struct ProjectWriter<W: Write + Seek> {
    chunks: ChunkWriter<W>,
}

impl<W: Write + Seek> ProjectWriter<W> {
    pub fn new(out: W) -> Result<ProjectWriter<W>, ProjectError> {
        Ok(ProjectWriter {
            chunks: ChunkWriter::new(out, ids::PROJECT)?,
        })
    }

    /// Writes the whole project and returns the sink.
    pub fn write(mut self, project: &Project) -> Result<W, ProjectError> {
        let version = VersionChunk {
            branch: BRANCH,
            version: FORMAT_VERSION,
        };
        self.chunks.write_chunk(ids::VERSION, &version.to_bytes())?;

        self.write_info(&project.info)?;
        for instrument in &project.instruments {
            self.write_instrument(instrument)?;
        }
        for song in &project.songs {
            self.write_song(song)?;
        }

        Ok(self.chunks.finish()?)
    }

    fn write_text(&mut self, id: ChunkId, text: &[u8]) -> Result<(), ProjectError> {
        if !text.is_empty() {
            self.chunks.write_chunk(id, text)?;
        }
        Ok(())
    }

    fn write_info(&mut self, info: &Info) -> Result<(), ProjectError> {
        self.chunks.begin_list(ids::INFO)?;
        self.write_text(ids::NAME, &info.name)?;
        self.write_text(ids::ARTIST, &info.artist)?;
        self.write_text(ids::COMMENTS, &store_comments(&info.comments))?;
        self.write_text(ids::COPYRIGHT, &info.copyright)?;
        self.write_text(ids::CREATED, &info.created)?;
        self.write_text(ids::SOFTWARE, software_signature().as_bytes())?;
        self.chunks.finish_list()?;
        Ok(())
    }

    fn write_instrument(
        &mut self,
        instrument: &Instrument,
    ) -> Result<(), ProjectError> {
        self.chunks.begin_list(ids::INSTRUMENT)?;
        self.write_text(ids::NAME, &instrument.name)?;
        self.chunks.finish_list()?;
        Ok(())
    }

    fn write_song(&mut self, song: &Song) -> Result<(), ProjectError> {
        self.chunks.begin_list(ids::SONG)?;
        self.chunks.write_chunk(
            ids::EFFECT_COLUMNS,
            &EffectColumns(song.effect_columns).to_bytes(),
        )?;
        self.write_text(ids::NAME, &song.name)?;
        if let Some(color) = song.color {
            self.chunks.write_chunk(ids::COLOR, &Color(color).to_bytes())?;
        }
        for pattern in &song.patterns {
            self.write_pattern(pattern)?;
        }
        self.chunks.finish_list()?;
        Ok(())
    }

    fn write_pattern(&mut self, pattern: &Pattern) -> Result<(), ProjectError> {
        self.chunks.begin_list(ids::PATTERN)?;
        self.chunks.write_chunk(
            ids::PATTERN_INDEX,
            &PatternIndex(pattern.index).to_bytes(),
        )?;
        self.write_text(ids::BEATS_MAJOR, &pattern.beats_major)?;
        self.write_text(ids::BEATS_MINOR, &pattern.beats_minor)?;
        for track in &pattern.tracks {
            self.chunks.write_chunk(ids::NOTES, &encode_notes(track))?;
        }
        self.chunks.finish_list()?;
        Ok(())
    }
}

/// Creates (or truncates) `path` and saves the project into it.
pub fn save_project<P: AsRef<Path>>(
    path: P,
    project: &Project,
) -> Result<(), ProjectError> {
    let file = BufWriter::new(File::create(path)?);
    let mut file = ProjectWriter::new(file)?.write(project)?;
    file.flush()?;
    Ok(())
}
