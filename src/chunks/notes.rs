//! Packed note stream stored in `note` chunks.
//!
//! A stream is a little-endian `u32` record count followed by one record per
//! cell. A record is a note byte, a flag byte and an optional instrument
//! byte, any of which may be left out while a repeat run for that field is
//! pending. The note value 253 stands for a whole record: a copy of the last
//! cell flagged as default.
//!
//! Flag byte:
//!
//! | bit | meaning                                      |
//! |-----|----------------------------------------------|
//! | 7   | no attack                                    |
//! | 6   | instrument follows                           |
//! | 5   | effect columns follow (not supported)        |
//! | 4   | this cell becomes the default cell           |
//! | 3   | repeat note, var16 count follows             |
//! | 2   | repeat instrument, var16 count follows       |
//! | 1   | repeat flags (bits 1-3 cleared), count follows |

use crate::error::NoteError;
use crate::var16;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::cmp;
use std::convert::TryFrom;

pub const MAX_PITCH: u8 = 95;
pub const REPEAT_DEFAULT: u8 = 253;
pub const KEY_OFF: u8 = 254;
pub const EMPTY: u8 = 255;

const NO_ATTACK: u8 = 0x80;
const HAS_INSTRUMENT: u8 = 0x40;
const HAS_EFFECTS: u8 = 0x20;
const SET_DEFAULT: u8 = 0x10;
const REPEAT_NOTE: u8 = 0x08;
const REPEAT_INSTRUMENT: u8 = 0x04;
const REPEAT_FLAGS: u8 = 0x02;
const REPEAT_MASK: u8 = REPEAT_NOTE | REPEAT_INSTRUMENT | REPEAT_FLAGS;

/// How far ahead the encoder looks for another copy of a cell before
/// flagging it as the default.
const DEFAULT_LOOKAHEAD: usize = 64;

/// A pitch (0-95), a key-off or nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Note(u8);

impl Note {
    pub const EMPTY: Note = Note(EMPTY);
    pub const KEY_OFF: Note = Note(KEY_OFF);

    pub fn pitch(pitch: u8) -> Option<Note> {
        if pitch <= MAX_PITCH {
            Some(Note(pitch))
        } else {
            None
        }
    }

    /// Accepts the stored values 0-95, 254 and 255.
    pub fn from_byte(value: u8) -> Option<Note> {
        match value {
            0..=MAX_PITCH | KEY_OFF | EMPTY => Some(Note(value)),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_pitch(self) -> Option<u8> {
        if self.0 <= MAX_PITCH {
            Some(self.0)
        } else {
            None
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == EMPTY
    }
}

impl Default for Note {
    fn default() -> Note {
        Note::EMPTY
    }
}

/// One tracker cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub note: Note,
    pub instrument: Option<u8>,
    pub attack: bool,
}

impl Default for Cell {
    fn default() -> Cell {
        Cell {
            note: Note::EMPTY,
            instrument: None,
            attack: true,
        }
    }
}

impl Cell {
    /// Flag bits describing the cell itself, without default/repeat control.
    fn flags(&self) -> u8 {
        let mut flags = 0;
        if !self.attack {
            flags |= NO_ATTACK;
        }
        if self.instrument.is_some() {
            flags |= HAS_INSTRUMENT;
        }
        flags
    }
}

/// A value standing in for the next `remaining` reads of a field.
#[derive(Clone, Copy, Debug, Default)]
struct Run {
    value: u8,
    remaining: u16,
}

impl Run {
    fn pending(&self) -> bool {
        self.remaining > 0
    }

    fn take(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.value)
    }

    fn start(&mut self, value: u8, count: u16) {
        self.value = value;
        self.remaining = count;
    }
}

/// Codec state shared by both directions. Lives for one stream.
#[derive(Debug, Default)]
struct State {
    default: Cell,
    note: Run,
    instrument: Run,
    flags: Run,
}

impl State {
    fn idle(&self) -> bool {
        !self.note.pending()
            && !self.instrument.pending()
            && !self.flags.pending()
    }
}

fn resolve<B: Buf>(run: &mut Run, buf: &mut B) -> Option<u8> {
    match run.take() {
        Some(value) => Some(value),
        None if buf.has_remaining() => Some(buf.get_u8()),
        None => None,
    }
}

/// Decodes a note stream.
///
/// A stream cut short yields the records that were complete; only bad
/// record contents are errors.
pub fn decode_notes(data: Bytes) -> Result<Vec<Cell>, NoteError> {
    let mut buf = data;
    if buf.remaining() < 4 {
        return Ok(vec![]);
    }

    let count = buf.get_u32_le() as usize;
    let mut cells = Vec::with_capacity(cmp::min(count, buf.remaining()));
    let mut state = State::default();

    for record in 0..count {
        match decode_record(&mut state, &mut buf, record)? {
            Some(cell) => cells.push(cell),
            None => {
                log::debug!(
                    "note stream truncated after {} of {} record(s)",
                    record,
                    count
                );
                break;
            }
        }
    }

    Ok(cells)
}

/// `Ok(None)` means the buffer ran out mid record.
fn decode_record<B: Buf>(
    state: &mut State,
    buf: &mut B,
    record: usize,
) -> Result<Option<Cell>, NoteError> {
    let note = match resolve(&mut state.note, buf) {
        Some(note) => note,
        None => return Ok(None),
    };
    if note == REPEAT_DEFAULT {
        return Ok(Some(state.default));
    }
    let note = Note::from_byte(note)
        .ok_or(NoteError::NoteOutOfRange { record, value: note })?;

    let flags = match resolve(&mut state.flags, buf) {
        Some(flags) => flags,
        None => return Ok(None),
    };

    let instrument = if flags & HAS_INSTRUMENT != 0 {
        match resolve(&mut state.instrument, buf) {
            Some(instrument) => Some(instrument),
            None => return Ok(None),
        }
    } else {
        None
    };

    if flags & HAS_EFFECTS != 0 {
        return Err(NoteError::EffectsUnsupported { record });
    }

    let cell = Cell {
        note,
        instrument,
        attack: flags & NO_ATTACK == 0,
    };
    if flags & SET_DEFAULT != 0 {
        state.default = cell;
    }

    if flags & REPEAT_NOTE != 0 {
        match var16::decode(buf) {
            Some(count) => state.note.start(note.value(), count),
            None => return Ok(None),
        }
    }
    if flags & REPEAT_INSTRUMENT != 0 {
        match var16::decode(buf) {
            Some(count) => {
                state.instrument.start(instrument.unwrap_or(0), count)
            }
            None => return Ok(None),
        }
    }
    if flags & REPEAT_FLAGS != 0 {
        match var16::decode(buf) {
            Some(count) => state.flags.start(flags & !REPEAT_MASK, count),
            None => return Ok(None),
        }
    }

    Ok(Some(cell))
}

/// Encodes cells into a note stream, folding repeated values into runs and
/// reusing the default cell where it pays off.
///
/// # Panics
///
/// If there are more than `u32::MAX` cells; the record count is 32 bit.
pub fn encode_notes(cells: &[Cell]) -> Bytes {
    let mut out = BytesMut::with_capacity(4 + cells.len() * 3);
    out.put_u32_le(record_count(cells.len()));

    let mut state = State::default();
    for (i, cell) in cells.iter().enumerate() {
        encode_record(&mut state, cell, &cells[i + 1..], &mut out);
    }

    out.freeze()
}

/// Length of the run of cells at the start of `rest` matching `same`.
fn run_len<F: Fn(&Cell) -> bool>(rest: &[Cell], same: F) -> u16 {
    rest.iter()
        .take(var16::MAX as usize)
        .take_while(|c| same(*c))
        .count() as u16
}

fn record_count(len: usize) -> u32 {
    u32::try_from(len).expect("note stream holds at most u32::MAX records")
}

fn put_count(out: &mut BytesMut, count: u16) {
    var16::encode(count, out).expect("run_len caps counts at var16::MAX");
}

// Mirrors decode_record step for step so both sides agree on run and
// default state after every record.
fn encode_record(
    state: &mut State,
    cell: &Cell,
    rest: &[Cell],
    out: &mut BytesMut,
) {
    if state.idle() && *cell == state.default {
        out.put_u8(REPEAT_DEFAULT);
        return;
    }

    let note_fresh = state.note.take().is_none();
    let instrument_fresh = !state.instrument.pending();

    let mut note_count = 0;
    let mut instrument_count = 0;
    let mut flags_count = 0;

    let cached_flags = state.flags.take();
    let flags = match cached_flags {
        Some(flags) => flags,
        None => {
            let mut flags = cell.flags();
            if *cell != state.default
                && rest.iter().take(DEFAULT_LOOKAHEAD).any(|c| c == cell)
            {
                flags |= SET_DEFAULT;
            }
            if note_fresh {
                note_count = run_len(rest, |c| c.note == cell.note);
                if note_count > 0 {
                    flags |= REPEAT_NOTE;
                }
            }
            if let (Some(instrument), true) = (cell.instrument, instrument_fresh)
            {
                instrument_count =
                    run_len(rest, |c| c.instrument == Some(instrument));
                if instrument_count > 0 {
                    flags |= REPEAT_INSTRUMENT;
                }
            }
            flags_count = run_len(rest, |c| c.flags() == cell.flags());
            if flags_count > 0 {
                flags |= REPEAT_FLAGS;
            }
            flags
        }
    };

    let instrument = match cell.instrument {
        Some(instrument) => state.instrument.take().or(Some(instrument)),
        None => None,
    };
    debug_assert_eq!(instrument, cell.instrument);

    if note_fresh {
        out.put_u8(cell.note.value());
    }
    if cached_flags.is_none() {
        out.put_u8(flags);
    }
    if let (Some(instrument), true) = (instrument, instrument_fresh) {
        out.put_u8(instrument);
    }

    if flags & SET_DEFAULT != 0 {
        state.default = *cell;
    }
    if flags & REPEAT_NOTE != 0 {
        put_count(out, note_count);
        state.note.start(cell.note.value(), note_count);
    }
    if flags & REPEAT_INSTRUMENT != 0 {
        put_count(out, instrument_count);
        state
            .instrument
            .start(cell.instrument.unwrap_or(0), instrument_count);
    }
    if flags & REPEAT_FLAGS != 0 {
        put_count(out, flags_count);
        state.flags.start(flags & !REPEAT_MASK, flags_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn run_counts_up_to_var16_max() {
        let mut out = BytesMut::new();
        put_count(&mut out, var16::MAX);
        assert_eq!(&out[..], &[0x3f, 0xff]);
    }

    #[test]
    #[should_panic(expected = "var16::MAX")]
    fn run_count_past_var16_max() {
        put_count(&mut BytesMut::new(), var16::MAX + 1);
    }

    #[test]
    fn record_count_fits() {
        assert_eq!(record_count(0), 0);
        assert_eq!(record_count(u32::MAX as usize), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    #[should_panic(expected = "u32::MAX records")]
    fn record_count_overflow() {
        record_count(u32::MAX as usize + 1);
    }

    fn cell(note: u8, instrument: Option<u8>, attack: bool) -> Cell {
        Cell {
            note: Note::from_byte(note).unwrap(),
            instrument,
            attack,
        }
    }

    fn stream(count: u32, records: &[u8]) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(count);
        out.put_slice(records);
        out.freeze()
    }

    #[test]
    fn sentinel_before_any_default() {
        let cells = decode_notes(stream(1, &[REPEAT_DEFAULT])).unwrap();
        assert_eq!(cells, vec![Cell::default()]);
        assert_eq!(cells[0].note, Note::EMPTY);
        assert!(cells[0].attack);
        assert_eq!(cells[0].instrument, None);
    }

    #[test]
    fn literal_records() {
        let data = stream(
            3,
            &[
                12, HAS_INSTRUMENT, 4, // C-1, instrument 4
                KEY_OFF, NO_ATTACK,
                EMPTY, 0,
            ],
        );
        assert_eq!(
            decode_notes(data).unwrap(),
            vec![
                cell(12, Some(4), true),
                cell(KEY_OFF, None, false),
                cell(EMPTY, None, true),
            ]
        );
    }

    #[test]
    fn set_default_then_sentinel() {
        let data = stream(
            3,
            &[
                30,
                HAS_INSTRUMENT | SET_DEFAULT,
                2,
                REPEAT_DEFAULT,
                REPEAT_DEFAULT,
            ],
        );
        let expected = cell(30, Some(2), true);
        assert_eq!(decode_notes(data).unwrap(), vec![expected; 3]);
    }

    #[test]
    fn three_identical_records_compress() {
        let c = cell(40, Some(3), true);
        let cells = vec![c; 3];
        let encoded = encode_notes(&cells);

        // count + three literal records of note, flags and instrument
        assert!(encoded.len() < 4 + 3 * 3, "{} bytes", encoded.len());

        let decoded = decode_notes(encoded).unwrap();
        assert_eq!(decoded.len(), 3);
        for d in decoded {
            assert_eq!(
                (d.note, d.instrument, d.attack),
                (c.note, c.instrument, c.attack)
            );
        }
    }

    #[test]
    fn instrument_run_skips_records_without_instrument() {
        let data = stream(
            3,
            &[
                10, HAS_INSTRUMENT | REPEAT_INSTRUMENT, 7, 0x41, // one more use of 7
                11, 0,                                       // no instrument
                12, HAS_INSTRUMENT,                          // 7 from the run
            ],
        );
        assert_eq!(
            decode_notes(data).unwrap(),
            vec![
                cell(10, Some(7), true),
                cell(11, None, true),
                cell(12, Some(7), true),
            ]
        );
    }

    #[test]
    fn flag_run_drops_repeat_bits() {
        // note run of 1 and flag run of 2 start together; the cached flag
        // byte must not restart the note run
        let data = stream(
            3,
            &[
                50, NO_ATTACK | REPEAT_NOTE | REPEAT_FLAGS, 0x41, 0x42,
                51,
            ],
        );
        assert_eq!(
            decode_notes(data).unwrap(),
            vec![
                cell(50, None, false),
                cell(50, None, false),
                cell(51, None, false),
            ]
        );
    }

    #[test]
    fn effects_are_rejected() {
        let data = stream(2, &[10, 0, 11, HAS_EFFECTS, 0, 0]);
        assert_eq!(
            decode_notes(data),
            Err(NoteError::EffectsUnsupported { record: 1 })
        );
    }

    #[test]
    fn note_out_of_range() {
        let data = stream(1, &[96, 0]);
        assert_eq!(
            decode_notes(data),
            Err(NoteError::NoteOutOfRange { record: 0, value: 96 })
        );
    }

    #[test]
    fn truncated_stream_yields_prefix() {
        let data = stream(4, &[10, 0, 11, 0, 12]);
        assert_eq!(
            decode_notes(data).unwrap(),
            vec![cell(10, None, true), cell(11, None, true)]
        );

        assert_eq!(
            decode_notes(Bytes::from_static(&[1, 0])).unwrap(),
            Vec::<Cell>::new()
        );
    }

    #[test]
    fn empty_cells_cost_one_byte() {
        let encoded = encode_notes(&[Cell::default(); 5]);
        assert_eq!(&encoded[4..], &[REPEAT_DEFAULT; 5]);
    }

    #[test]
    fn round_trip_hand_picked() {
        let a = cell(24, Some(1), true);
        let b = cell(KEY_OFF, None, false);
        let cells = vec![
            a,
            a,
            Cell::default(),
            b,
            cell(24, Some(2), true),
            cell(24, Some(2), false),
            a,
            Cell::default(),
            b,
            b,
            cell(95, Some(255), true),
            cell(0, Some(0), true),
        ];
        assert_eq!(decode_notes(encode_notes(&cells)).unwrap(), cells);
    }

    #[test]
    fn round_trip_long_runs() {
        let mut cells = vec![cell(60, Some(9), true); 300];
        cells.extend(vec![Cell::default(); 20_000]);
        cells.extend(vec![cell(61, Some(9), false); 17_000]);
        assert_eq!(decode_notes(encode_notes(&cells)).unwrap(), cells);
    }

    #[test]
    fn round_trip_random() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let len = rng.gen_range(0..300);
            // few distinct values so runs and defaults actually happen
            let cells: Vec<Cell> = (0..len)
                .map(|_| {
                    let note = match rng.gen_range(0..6) {
                        0 => EMPTY,
                        1 => KEY_OFF,
                        _ => rng.gen_range(0..4) * 12,
                    };
                    let instrument = if rng.gen_bool(0.6) {
                        Some(rng.gen_range(0..3))
                    } else {
                        None
                    };
                    cell(note, instrument, rng.gen_bool(0.8))
                })
                .collect();

            let encoded = encode_notes(&cells);
            assert_eq!(decode_notes(encoded).unwrap(), cells);
        }
    }

    #[test]
    fn note_constructors() {
        assert_eq!(Note::pitch(95).map(Note::value), Some(95));
        assert_eq!(Note::pitch(96), None);
        assert_eq!(Note::from_byte(REPEAT_DEFAULT), None);
        assert_eq!(Note::KEY_OFF.as_pitch(), None);
        assert!(Note::default().is_empty());
    }
}
