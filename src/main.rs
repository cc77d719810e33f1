use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chunktrack::{ChunkReader, Note, ProjectReader};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// chunktrack project file tools
#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunk hierarchy with offsets and sizes
    Tree {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Load the project and summarize it
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the decoded cells of one pattern
    Notes {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Song index, from 0
        song: usize,
        /// Pattern index within the song, from 0
        pattern: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tree { file } => tree(&file)?,
        Commands::Info { file } => info(&file)?,
        Commands::Notes {
            file,
            song,
            pattern,
        } => notes(&file, song, pattern)?,
    }

    Ok(())
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

/// Indentation stops growing past this depth.
const MAX_INDENT: usize = 32;

fn tree(path: &Path) -> Result<()> {
    let mut reader = ChunkReader::open(open(path)?, None)
        .with_context(|| format!("reading {}", path.display()))?;
    let stdout = io::stdout();
    print_tree(&mut reader, &mut stdout.lock())
}

fn print_tree<S, W>(reader: &mut ChunkReader<S>, out: &mut W) -> Result<()>
where
    S: Read + Seek,
    W: Write,
{
    writeln!(out, "{} ({} bytes)", reader.form_type(), reader.file_size())?;

    // walks with the reader's own level stack, so nesting depth costs no
    // call stack
    loop {
        let id = match reader.next_chunk_id()? {
            Some(id) => id,
            None if reader.depth() > 0 => {
                reader.ascend()?;
                continue;
            }
            None => break,
        };
        let header = *reader.current().context("lost current chunk")?;
        let indent = "  ".repeat(reader.depth().min(MAX_INDENT) + 1);

        if header.is_list() {
            let list_type = reader.descend()?;
            writeln!(
                out,
                "{}{} {} @{} {} bytes",
                indent, id, list_type, header.start, header.size
            )?;
        } else {
            writeln!(
                out,
                "{}{}      @{} {} bytes",
                indent, id, header.start, header.size
            )?;
        }
    }

    for deviation in reader.deviations() {
        writeln!(out, "warning: {:?}", deviation)?;
    }
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let mut reader = ProjectReader::new(open(path)?)?;
    let project = reader
        .read()
        .with_context(|| format!("loading {}", path.display()))?;

    let text = |b: &[u8]| String::from_utf8_lossy(b).into_owned();
    println!("name:      {}", text(&project.info.name));
    println!("artist:    {}", text(&project.info.artist));
    println!("copyright: {}", text(&project.info.copyright));
    println!("created:   {}", text(&project.info.created));
    println!("software:  {}", text(&project.info.software));
    if !project.info.comments.is_empty() {
        println!("comments:");
        for line in text(&project.info.comments).lines() {
            println!("  {}", line);
        }
    }

    println!("instruments: {}", project.instruments.len());
    for (i, instrument) in project.instruments.iter().enumerate() {
        println!("  {:02x} {}", i, text(&instrument.name));
    }

    println!("songs: {}", project.songs.len());
    for (i, song) in project.songs.iter().enumerate() {
        let cells: usize = song
            .patterns
            .iter()
            .flat_map(|p| p.tracks.iter())
            .map(Vec::len)
            .sum();
        println!(
            "  {} \"{}\": {} pattern(s), {} cell(s)",
            i,
            text(&song.name),
            song.patterns.len(),
            cells
        );
    }

    for warning in reader.warnings() {
        println!("warning: {}", warning);
    }
    Ok(())
}

fn notes(path: &Path, song: usize, pattern: usize) -> Result<()> {
    let mut reader = ProjectReader::new(open(path)?)?;
    let project = reader.read()?;
    let pattern = project
        .songs
        .get(song)
        .with_context(|| format!("no song {}", song))?
        .patterns
        .get(pattern)
        .with_context(|| format!("no pattern {} in song {}", pattern, song))?;

    let rows = pattern.tracks.iter().map(Vec::len).max().unwrap_or(0);
    for row in 0..rows {
        let mut line = format!("{:3} ", row);
        for track in &pattern.tracks {
            match track.get(row) {
                Some(cell) => {
                    let instrument = cell
                        .instrument
                        .map(|i| format!("{:02X}", i))
                        .unwrap_or_else(|| "..".to_string());
                    let attack = if cell.attack { ' ' } else { '~' };
                    line.push_str(&format!(
                        "| {}{} {} ",
                        note_name(cell.note),
                        attack,
                        instrument
                    ));
                }
                None => line.push_str("|          "),
            }
        }
        println!("{}", line);
    }
    Ok(())
}

fn note_name(note: Note) -> String {
    const NAMES: [&str; 12] = [
        "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
    ];
    match note.as_pitch() {
        Some(pitch) => {
            format!("{}{}", NAMES[(pitch % 12) as usize], pitch / 12)
        }
        None if note.is_empty() => "...".to_string(),
        None => "===".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunktrack::{ids, ChunkWriter};
    use std::io::Cursor;

    fn tree_of(data: Vec<u8>) -> String {
        let mut reader = ChunkReader::open(Cursor::new(data), None).unwrap();
        let mut out = vec![];
        print_tree(&mut reader, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn prints_nested_lists() {
        let mut w =
            ChunkWriter::new(Cursor::new(vec![]), ids::PROJECT).unwrap();
        w.begin_list(ids::SONG).unwrap();
        w.write_chunk(ids::NAME, b"x").unwrap();
        w.finish_list().unwrap();
        w.write_chunk(ids::ARTIST, b"ab").unwrap();
        let data = w.finish().unwrap().into_inner();

        let text = tree_of(data);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "CTRK (44 bytes)",
                "  LIST song @12 14 bytes",
                "    INAM      @24 1 bytes",
                "  IART      @34 2 bytes",
            ]
        );
    }

    #[test]
    fn deep_nesting_is_walked() {
        const DEPTH: usize = 50_000;
        let mut w =
            ChunkWriter::new(Cursor::new(vec![]), ids::PROJECT).unwrap();
        for _ in 0..DEPTH {
            w.begin_list(ids::PATTERN).unwrap();
        }
        w.write_chunk(ids::NAME, b"deep").unwrap();
        for _ in 0..DEPTH {
            w.finish_list().unwrap();
        }
        let data = w.finish().unwrap().into_inner();

        let text = tree_of(data);
        assert_eq!(text.lines().count(), DEPTH + 2);
        assert!(text.lines().any(|l| l.trim_start().starts_with("INAM")));
    }
}
