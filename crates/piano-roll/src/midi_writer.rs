use crate::note::NoteEvent;
use rollconf::ExportConfig;
use serde::{Deserialize, Serialize};

/// Options for MIDI export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Ticks per quarter note. Default: 480.
    pub ticks_per_beat: u16,
    /// Tempo written to the tempo track. Default: 120.
    pub tempo_bpm: f64,
    /// Note-on velocity. Default: 90.
    pub velocity: u8,
    /// Channel for all notes. Default: 0.
    pub channel: u8,
    /// 0-indexed GM program; no program change when unset.
    pub program: Option<u8>,
    pub track_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            tempo_bpm: 120.0,
            velocity: 90,
            channel: 0,
            program: None,
            track_name: "Piano Roll".to_string(),
        }
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            ticks_per_beat: config.ticks_per_beat,
            tempo_bpm: config.tempo_bpm,
            velocity: config.velocity,
            program: config.program,
            ..Self::default()
        }
    }
}

/// Write decoded notes to Standard MIDI File format 1 bytes.
///
/// Track 0: tempo and a 4/4 time signature.
/// Track 1: track name, optional program change, note events. Tied
/// durations sound as one note spanning all components.
pub fn notes_to_midi(notes: &[NoteEvent], options: &ExportOptions) -> Vec<u8> {
    let tracks = vec![build_tempo_track(options), build_note_track(notes, options)];
    build_midi_file(options.ticks_per_beat, &tracks)
}

/// Build the tempo/time-signature track.
fn build_tempo_track(options: &ExportOptions) -> Vec<u8> {
    let bpm = if options.tempo_bpm > 0.0 {
        options.tempo_bpm
    } else {
        120.0
    };
    let usec = (60_000_000.0 / bpm).round() as u32;

    let mut track_data = Vec::new();

    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[
        0xFF,
        0x51,
        0x03,
        (usec >> 16) as u8,
        (usec >> 8) as u8,
        usec as u8,
    ]);

    // 4/4, 24 clocks per click, 8 notated 32nds per quarter
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x58, 0x04, 4, 2, 0x18, 0x08]);

    // End of track
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Build the track holding every decoded note.
fn build_note_track(notes: &[NoteEvent], options: &ExportOptions) -> Vec<u8> {
    let channel = options.channel & 0x0F;
    let ppq = f64::from(options.ticks_per_beat);
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    // Track name
    let name_bytes = options.track_name.as_bytes();
    let mut name_event = vec![0xFF, 0x03];
    write_vlq(&mut name_event, name_bytes.len() as u32);
    name_event.extend_from_slice(name_bytes);
    events.push((0, name_event));

    if let Some(program) = options.program {
        events.push((0, vec![0xC0 | channel, program & 0x7F]));
    }

    for note in notes {
        let Ok(key) = u8::try_from(note.midi_number()) else {
            continue;
        };
        if key > 127 {
            continue;
        }

        if note.duration.quarter_length <= 0.0 {
            continue;
        }
        let onset = (note.offset * ppq).round() as u64;
        // Coarse resolutions can round a sixteenth to nothing
        let length = ((note.duration.quarter_length * ppq).round() as u64).max(1);

        events.push((onset, vec![0x90 | channel, key, options.velocity.clamp(1, 127)]));
        events.push((onset + length, vec![0x80 | channel, key, 0]));
    }

    // Sort by tick, with note-offs before note-ons at the same tick
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    let mut track_data = Vec::new();
    let mut last_tick = 0u64;

    for (tick, data) in events {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    // End of track
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    // MThd header
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    // MTrk chunks
    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        buf.push(0);
        return;
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
