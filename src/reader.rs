use crate::chunks::notes::decode_notes;
use crate::chunks::reader::{ChunkReader, Deviation};
use crate::chunks::{Chunk, Color, EffectColumns, PatternIndex, VersionChunk};
use crate::error::{ChunkError, ProjectError};
use crate::ids::{self, ChunkId};
use crate::project::{load_comments, Info, Instrument, Pattern, Project, Song};
use crate::{software_signature, BRANCH, FORMAT_VERSION};
use bytes::Bytes;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// Something the loader noticed but worked around.
#[derive(Debug)]
pub enum Warning {
    Container(Deviation),
    /// The file was written by other software (or another version of it).
    SoftwareMismatch { found: Bytes },
    /// A root level list was malformed and left out of the project.
    SkippedList {
        offset: u64,
        list_type: Option<ChunkId>,
        error: ProjectError,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Container(Deviation::ExcessBytes { offset, count }) => {
                write!(f, "{} stray byte(s) at offset {}", count, offset)
            }
            Warning::Container(Deviation::TrailingData { offset, count }) => {
                write!(f, "{} byte(s) after the container at {}", count, offset)
            }
            Warning::SoftwareMismatch { found } => write!(
                f,
                "written by \"{}\"",
                String::from_utf8_lossy(found)
            ),
            Warning::SkippedList {
                offset,
                list_type: Some(list_type),
                error,
            } => write!(
                f,
                "skipped {} list at offset {}: {}",
                list_type, offset, error
            ),
            Warning::SkippedList { offset, error, .. } => {
                write!(f, "skipped list at offset {}: {}", offset, error)
            }
        }
    }
}

/// Loads a project from a chunk container.
pub struct ProjectReader<S: Read + Seek> {
    chunks: ChunkReader<S>,
    opened: Vec<Deviation>,
    warnings: Vec<Warning>,
}

impl<S: Read + Seek> ProjectReader<S> {
    pub fn new(source: S) -> Result<ProjectReader<S>, ProjectError> {
        ProjectReader::open(source, None)
    }

    /// Like `new`, but fails unless the container is exactly `size` bytes.
    pub fn with_size(
        source: S,
        size: u64,
    ) -> Result<ProjectReader<S>, ProjectError> {
        ProjectReader::open(source, Some(size))
    }

    fn open(
        source: S,
        size: Option<u64>,
    ) -> Result<ProjectReader<S>, ProjectError> {
        let mut chunks = ChunkReader::open(source, size)?;
        if chunks.form_type() != ids::PROJECT {
            return Err(ProjectError::InvalidForm(chunks.form_type()));
        }
        let opened = chunks.take_deviations();

        Ok(ProjectReader {
            chunks,
            opened,
            warnings: vec![],
        })
    }

    /// Warnings from the last `read`.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn read(&mut self) -> Result<Project, ProjectError> {
        self.warnings = self
            .opened
            .iter()
            .copied()
            .map(Warning::Container)
            .collect();
        self.chunks.rewind()?;

        let mut project = Project::default();
        let mut version = None;

        while let Some(id) = self.chunks.next_chunk_id()? {
            match id {
                ids::VERSION => {
                    let ver = VersionChunk::parse(&self.chunks.read_payload()?)?;
                    check_version(&ver)?;
                    log::debug!("format version {}", ver.version);
                    version = Some(ver);
                }
                ids::LIST => {
                    // nothing is trusted before the version gate
                    if version.is_none() {
                        return Err(ProjectError::MissingVersion);
                    }
                    self.read_list(&mut project)?;
                }
                id => log::debug!("skipping root chunk {}", id),
            }
        }

        if version.is_none() {
            return Err(ProjectError::MissingVersion);
        }

        let deviations = self.chunks.take_deviations();
        self.warnings
            .extend(deviations.into_iter().map(Warning::Container));
        Ok(project)
    }

    /// Reads one root level list. Malformed lists are skipped with a
    /// warning; i/o errors still abort.
    fn read_list(&mut self, project: &mut Project) -> Result<(), ProjectError> {
        let depth = self.chunks.depth();
        let offset = self.chunks.current().map(|c| c.start).unwrap_or(0);

        let mut list_type = None;
        let error = match self.read_list_body(project, &mut list_type) {
            Ok(()) => return Ok(()),
            Err(ProjectError::Chunk(ChunkError::Io(e))) => {
                return Err(ChunkError::Io(e).into())
            }
            Err(error) => error,
        };

        if list_type.is_none() && self.chunks.depth() > depth {
            list_type = Some(self.chunks.list_type());
        }
        while self.chunks.depth() > depth {
            self.chunks.ascend()?;
        }

        let warning = Warning::SkippedList {
            offset,
            list_type,
            error,
        };
        log::warn!("{}", warning);
        self.warnings.push(warning);
        Ok(())
    }

    fn read_list_body(
        &mut self,
        project: &mut Project,
        list_type: &mut Option<ChunkId>,
    ) -> Result<(), ProjectError> {
        let ty = self.chunks.descend()?;
        *list_type = Some(ty);

        match ty {
            ids::INFO => self.read_info(&mut project.info)?,
            ids::SONG => {
                let song = self.read_song()?;
                project.songs.push(song);
            }
            ids::INSTRUMENT => {
                let instrument = self.read_instrument()?;
                project.instruments.push(instrument);
            }
            ty => log::debug!("skipping {} list", ty),
        }

        self.chunks.ascend()?;
        Ok(())
    }

    fn read_info(&mut self, info: &mut Info) -> Result<(), ProjectError> {
        while let Some(id) = self.chunks.next_chunk_id()? {
            match id {
                ids::ARTIST => info.artist = self.chunks.read_payload()?,
                ids::COMMENTS => {
                    let stored = self.chunks.read_payload()?;
                    info.comments = Bytes::from(load_comments(&stored));
                }
                ids::COPYRIGHT => info.copyright = self.chunks.read_payload()?,
                ids::CREATED => info.created = self.chunks.read_payload()?,
                ids::NAME => info.name = self.chunks.read_payload()?,
                ids::SOFTWARE => {
                    let software = self.chunks.read_payload()?;
                    if software != software_signature().as_bytes() {
                        let warning = Warning::SoftwareMismatch {
                            found: software.clone(),
                        };
                        log::warn!("{}", warning);
                        self.warnings.push(warning);
                    }
                    info.software = software;
                }
                id => log::debug!("skipping info chunk {}", id),
            }
        }
        Ok(())
    }

    fn read_song(&mut self) -> Result<Song, ProjectError> {
        let mut song = Song::default();

        while let Some(id) = self.chunks.next_chunk_id()? {
            match id {
                ids::EFFECT_COLUMNS => {
                    let payload = self.chunks.read_payload()?;
                    song.effect_columns = EffectColumns::parse(&payload)?.0;
                }
                ids::NAME => song.name = self.chunks.read_payload()?,
                ids::COLOR => {
                    let payload = self.chunks.read_payload()?;
                    song.color = Some(Color::parse(&payload)?.0);
                }
                ids::LIST => {
                    match self.chunks.descend()? {
                        ids::PATTERN => {
                            let pattern = self.read_pattern()?;
                            song.patterns.push(pattern);
                        }
                        ty => log::debug!("skipping {} list in song", ty),
                    }
                    self.chunks.ascend()?;
                }
                id => log::debug!("skipping song chunk {}", id),
            }
        }

        Ok(song)
    }

    fn read_pattern(&mut self) -> Result<Pattern, ProjectError> {
        let mut pattern = Pattern::default();

        while let Some(id) = self.chunks.next_chunk_id()? {
            match id {
                ids::PATTERN_INDEX => {
                    let payload = self.chunks.read_payload()?;
                    pattern.index = PatternIndex::parse(&payload)?.0;
                }
                ids::BEATS_MAJOR => {
                    pattern.beats_major = self.chunks.read_payload()?
                }
                ids::BEATS_MINOR => {
                    pattern.beats_minor = self.chunks.read_payload()?
                }
                ids::NOTES => {
                    let cells = decode_notes(self.chunks.read_payload()?)?;
                    pattern.tracks.push(cells);
                }
                id => log::debug!("skipping pattern chunk {}", id),
            }
        }

        Ok(pattern)
    }

    fn read_instrument(&mut self) -> Result<Instrument, ProjectError> {
        let mut instrument = Instrument::default();
        while let Some(id) = self.chunks.next_chunk_id()? {
            match id {
                ids::NAME => instrument.name = self.chunks.read_payload()?,
                id => log::debug!("skipping instrument chunk {}", id),
            }
        }
        Ok(instrument)
    }
}

fn check_version(ver: &VersionChunk) -> Result<(), ProjectError> {
    if ver.branch != BRANCH {
        return Err(ProjectError::UnknownBranch(ver.branch));
    }
    if ver.version > FORMAT_VERSION {
        return Err(ProjectError::UnsupportedVersion {
            found: ver.version,
            supported: FORMAT_VERSION,
        });
    }
    Ok(())
}

/// Opens and loads a project file.
pub fn load_project<P: AsRef<Path>>(
    path: P,
) -> Result<(Project, Vec<Warning>), ProjectError> {
    let file = File::open(path)?;
    let mut reader = ProjectReader::new(file)?;
    let project = reader.read()?;
    Ok((project, reader.take_warnings()))
}
