extern crate chunktrack;

use chunktrack::{
    Cell, Instrument, Note, Pattern, Project, ProjectReader, ProjectWriter,
    Song,
};
use std::env;
use std::fs::File;
use std::io::Cursor;

fn demo_project() -> Project {
    let mut project = Project::default();
    project.instruments.push(Instrument::new("square"));

    let lead: Vec<Cell> = (0..16)
        .map(|row| Cell {
            note: if row % 4 == 0 {
                Note::pitch(48 + row as u8).unwrap_or(Note::EMPTY)
            } else {
                Note::EMPTY
            },
            instrument: if row % 4 == 0 { Some(0) } else { None },
            attack: true,
        })
        .collect();

    let mut song = Song::new("demo");
    song.patterns.push(Pattern {
        tracks: vec![lead],
        ..Pattern::default()
    });
    project.songs.push(song);
    project
}

fn main() {
    // Reads the file given on the command line, or a project built in memory.
    let project = match env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).expect("failed to open file");
            let mut reader = ProjectReader::new(file).expect("not a project");
            let project = reader.read().expect("failed to read project");
            for warning in reader.warnings() {
                println!("warning: {}", warning);
            }
            project
        }
        None => {
            let out = ProjectWriter::new(Cursor::new(vec![]))
                .and_then(|w| w.write(&demo_project()))
                .expect("failed to write project");
            println!("wrote {} bytes", out.get_ref().len());

            let mut reader =
                ProjectReader::new(Cursor::new(out.into_inner())).unwrap();
            reader.read().expect("failed to read project back")
        }
    };

    println!("{:#?}", project);
}
