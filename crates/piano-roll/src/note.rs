use crate::duration::TiedDuration;
use serde::{Deserialize, Serialize};

/// A chromatic pitch as pitch class (0 = C) and octave (C4 = middle C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub pitch_class: u8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(pitch_class: u8, octave: i8) -> Self {
        Self {
            pitch_class: pitch_class % 12,
            octave,
        }
    }

    pub fn from_midi(note: u8) -> Self {
        Self {
            pitch_class: note % 12,
            octave: (note / 12) as i8 - 1,
        }
    }

    /// MIDI note number, `12 * (octave + 1) + pitch_class`. May fall outside 0–127.
    pub fn midi_number(&self) -> i32 {
        12 * (i32::from(self.octave) + 1) + i32::from(self.pitch_class)
    }
}

/// A single MIDI note with absolute tick timing and source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub onset_tick: u64,
    pub offset_tick: u64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub program: u8,
    pub track_index: usize,
}

impl TimedNote {
    pub fn duration_ticks(&self) -> u64 {
        self.offset_tick.saturating_sub(self.onset_tick)
    }
}

/// A parsed musical event, timed in quarter lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreEvent {
    Note {
        pitch: Pitch,
        offset: f64,
        duration: f64,
    },
    /// Simultaneous pitches sharing one offset and duration.
    Chord {
        pitches: Vec<Pitch>,
        offset: f64,
        duration: f64,
    },
}

impl ScoreEvent {
    pub fn offset(&self) -> f64 {
        match self {
            ScoreEvent::Note { offset, .. } | ScoreEvent::Chord { offset, .. } => *offset,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            ScoreEvent::Note { duration, .. } | ScoreEvent::Chord { duration, .. } => *duration,
        }
    }

    pub fn pitches(&self) -> &[Pitch] {
        match self {
            ScoreEvent::Note { pitch, .. } => std::slice::from_ref(pitch),
            ScoreEvent::Chord { pitches, .. } => pitches,
        }
    }
}

/// A note reconstructed from one run in a piano-roll row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch_index: usize,
    pub pitch: Pitch,
    /// Start, in quarter lengths.
    pub offset: f64,
    pub duration: TiedDuration,
}

impl NoteEvent {
    pub fn midi_number(&self) -> i32 {
        self.pitch.midi_number()
    }

    pub fn duration_quarter_length(&self) -> f64 {
        self.duration.quarter_length
    }
}
