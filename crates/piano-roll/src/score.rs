//! MIDI bytes to quarter-length note and chord events.
//!
//! Notes are paired from note-on/note-off messages, grouped into instrument
//! parts by program, and simultaneous notes of equal length are collapsed
//! into chords.

use crate::note::{Pitch, ScoreEvent, TimedNote};
use crate::{Error, Result};
use midly::{MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// GM percussion channel (0-indexed).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Ticks per beat assumed for SMPTE-timed files.
const FALLBACK_PPQ: u16 = 480;

/// The notes of one instrument within a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// 0-indexed GM program.
    pub program: u8,
    pub is_percussion: bool,
    /// Ordered by offset.
    pub events: Vec<ScoreEvent>,
}

impl Part {
    pub fn note_count(&self) -> usize {
        self.events.iter().map(|e| e.pitches().len()).sum()
    }
}

/// A parsed file: its timing resolution and instrument parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub ticks_per_beat: u16,
    /// Ordered by first onset.
    pub parts: Vec<Part>,
}

impl Score {
    pub fn first_part(&self) -> Option<&Part> {
        self.parts.first()
    }

    /// Events of every part merged into one offset-ordered stream.
    pub fn flatten(&self) -> Vec<ScoreEvent> {
        let mut events: Vec<ScoreEvent> = self
            .parts
            .iter()
            .flat_map(|p| p.events.iter().cloned())
            .collect();
        events.sort_by(|a, b| a.offset().total_cmp(&b.offset()));
        events
    }

    pub fn note_count(&self) -> usize {
        self.parts.iter().map(Part::note_count).sum()
    }
}

/// Parse MIDI bytes into a [`Score`].
pub fn parse_score(midi_bytes: &[u8]) -> Result<Score> {
    let smf = Smf::parse(midi_bytes).map_err(|e| Error::MidiParse(e.to_string()))?;
    let (notes, ppq) = extract_notes(&smf);
    Ok(build_score(&notes, ppq))
}

/// Extract all notes, pairing note-on/note-off events.
///
/// Returns the notes sorted by onset then pitch, plus ticks per beat.
pub fn extract_notes(smf: &Smf) -> (Vec<TimedNote>, u16) {
    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(_, _) => FALLBACK_PPQ,
    };

    let mut all_notes = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        let mut programs = [0u8; 16];
        // (channel, key) -> stack of (onset_tick, velocity, program)
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8, u8)>> = HashMap::new();

        for event in track {
            current_tick += u64::from(event.delta.as_int());

            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let ch = channel.as_int();

            match message {
                MidiMessage::ProgramChange { program } => {
                    programs[usize::from(ch)] = program.as_int();
                }
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    pending.entry((ch, key.as_int())).or_default().push((
                        current_tick,
                        vel.as_int(),
                        programs[usize::from(ch)],
                    ));
                }
                // vel=0 NoteOn is NoteOff
                MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                    let slot = (ch, key.as_int());
                    if let Some((onset, velocity, program)) =
                        pending.get_mut(&slot).and_then(|stack| stack.pop())
                    {
                        all_notes.push(TimedNote {
                            onset_tick: onset,
                            offset_tick: current_tick,
                            pitch: slot.1,
                            velocity,
                            channel: ch,
                            program,
                            track_index,
                        });
                    }
                }
                _ => {}
            }
        }

        // Close any unclosed notes at the track's final tick
        for ((ch, pitch), stack) in pending {
            for (onset, velocity, program) in stack {
                all_notes.push(TimedNote {
                    onset_tick: onset,
                    offset_tick: current_tick,
                    pitch,
                    velocity,
                    channel: ch,
                    program,
                    track_index,
                });
            }
        }
    }

    all_notes.sort_by(|a, b| {
        a.onset_tick
            .cmp(&b.onset_tick)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.offset_tick.cmp(&b.offset_tick))
    });

    (all_notes, ppq)
}

/// Group sorted notes into instrument parts of note/chord events.
pub fn build_score(notes: &[TimedNote], ppq: u16) -> Score {
    // (program, is_percussion) in order of first onset
    let mut grouped: Vec<((u8, bool), Vec<&TimedNote>)> = Vec::new();

    for note in notes {
        let key = (note.program, note.channel == PERCUSSION_CHANNEL);
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, part_notes)) => part_notes.push(note),
            None => grouped.push((key, vec![note])),
        }
    }

    let parts = grouped
        .into_iter()
        .map(|((program, is_percussion), part_notes)| Part {
            program,
            is_percussion,
            events: chordify(&part_notes, ppq),
        })
        .collect();

    Score {
        ticks_per_beat: ppq,
        parts,
    }
}

/// Collapse notes sharing onset and offset into chords.
fn chordify(notes: &[&TimedNote], ppq: u16) -> Vec<ScoreEvent> {
    let mut sorted: Vec<&TimedNote> = notes.to_vec();
    sorted.sort_by(|a, b| {
        a.onset_tick
            .cmp(&b.onset_tick)
            .then(a.offset_tick.cmp(&b.offset_tick))
            .then(a.pitch.cmp(&b.pitch))
    });

    let ppq = f64::from(ppq.max(1));
    let mut events = Vec::new();

    for group in sorted.chunk_by(|a, b| {
        a.onset_tick == b.onset_tick && a.offset_tick == b.offset_tick
    }) {
        let first = group[0];
        let offset = first.onset_tick as f64 / ppq;
        let duration = first.duration_ticks() as f64 / ppq;

        let mut pitches: Vec<Pitch> = group.iter().map(|n| Pitch::from_midi(n.pitch)).collect();
        pitches.dedup();

        if pitches.len() == 1 {
            events.push(ScoreEvent::Note {
                pitch: pitches[0],
                offset,
                duration,
            });
        } else {
            events.push(ScoreEvent::Chord {
                pitches,
                offset,
                duration,
            });
        }
    }

    events
}


#[cfg(test)]
mod tests {
    use super::test_midi::two_track;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn melody_becomes_single_notes() {
        let mut body = Vec::new();
        // C4, E4, G4 quarter notes
        for key in [60u8, 64, 67] {
            body.extend_from_slice(&[0x00, 0x90, key, 100]);
            body.extend_from_slice(&[0x83, 0x60, 0x80, key, 0]);
        }
        let score = parse_score(&two_track(body)).unwrap();

        assert_eq!(score.ticks_per_beat, 480);
        assert_eq!(score.parts.len(), 1);
        let events = &score.parts[0].events;
        assert_eq!(
            events,
            &vec![
                ScoreEvent::Note { pitch: Pitch::new(0, 4), offset: 0.0, duration: 1.0 },
                ScoreEvent::Note { pitch: Pitch::new(4, 4), offset: 1.0, duration: 1.0 },
                ScoreEvent::Note { pitch: Pitch::new(7, 4), offset: 2.0, duration: 1.0 },
            ]
        );
    }

    #[test]
    fn simultaneous_notes_become_a_chord() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x00, 0x90, 60, 100]);
        body.extend_from_slice(&[0x00, 0x90, 64, 100]);
        body.extend_from_slice(&[0x00, 0x90, 67, 100]);
        body.extend_from_slice(&[0x87, 0x40, 0x80, 60, 0]);
        body.extend_from_slice(&[0x00, 0x80, 64, 0]);
        // vel=0 note-on as note-off
        body.extend_from_slice(&[0x00, 0x90, 67, 0]);
        let score = parse_score(&two_track(body)).unwrap();

        let events = &score.parts[0].events;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            ScoreEvent::Chord {
                pitches: vec![Pitch::new(0, 4), Pitch::new(4, 4), Pitch::new(7, 4)],
                offset: 0.0,
                duration: 2.0,
            }
        );
        assert_eq!(score.note_count(), 3);
    }

    #[test]
    fn programs_split_parts_in_onset_order() {
        let mut body = Vec::new();
        // Guitar (program 24) on channel 0, bass (program 32) on channel 1
        body.extend_from_slice(&[0x00, 0xC0, 24]);
        body.extend_from_slice(&[0x00, 0xC1, 32]);
        body.extend_from_slice(&[0x00, 0x91, 40, 90]);
        body.extend_from_slice(&[0x81, 0x70, 0x90, 64, 90]);
        body.extend_from_slice(&[0x81, 0x70, 0x81, 40, 0]);
        body.extend_from_slice(&[0x00, 0x80, 64, 0]);
        let score = parse_score(&two_track(body)).unwrap();

        assert_eq!(score.parts.len(), 2);
        assert_eq!(score.parts[0].program, 32);
        assert_eq!(score.parts[1].program, 24);
        assert_eq!(
            score.parts[1].events[0],
            ScoreEvent::Note { pitch: Pitch::new(4, 4), offset: 0.5, duration: 0.5 }
        );

        let flat = score.flatten();
        assert_eq!(flat.len(), 2);
        assert!(flat[0].offset() <= flat[1].offset());
    }

    #[test]
    fn percussion_channel_is_its_own_part() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x00, 0x99, 36, 100]);
        body.extend_from_slice(&[0x83, 0x60, 0x89, 36, 0]);
        let score = parse_score(&two_track(body)).unwrap();
        assert!(score.parts[0].is_percussion);
    }

    #[test]
    fn unclosed_note_ends_with_track() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x00, 0x90, 60, 100]);
        // Note never released; end-of-track 960 ticks later
        body.extend_from_slice(&[0x87, 0x40, 0xFF, 0x01, 0x00]);
        let score = parse_score(&two_track(body)).unwrap();
        assert_eq!(score.parts[0].events[0].duration(), 2.0);
    }

    #[test]
    fn empty_file_has_no_parts() {
        let score = parse_score(&two_track(Vec::new())).unwrap();
        assert!(score.parts.is_empty());
        assert!(score.first_part().is_none());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_score(b"not midi"), Err(Error::MidiParse(_))));
    }
}
