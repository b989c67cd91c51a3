//! Binary piano-roll encoding for symbolic music.
//!
//! Converts MIDI into a fixed-size occupancy matrix (72 pitch rows × 7000
//! sixteenth-note ticks by default) and reconstructs MIDI from such a
//! matrix. Also curates datasets: splitting multi-track files into
//! single-instrument tracks and merging ("smushing") tracks into one roll.
//!
//! # Example
//!
//! ```
//! use piano_roll::{Pitch, Pipeline, ScoreEvent};
//!
//! let pipeline = Pipeline::default();
//! let events = vec![ScoreEvent::Note {
//!     pitch: Pitch::new(4, 4),
//!     offset: 0.0,
//!     duration: 1.0,
//! }];
//!
//! let (roll, report) = pipeline.encoder().encode(&events);
//! assert_eq!(report.notes_written, 1);
//! assert_eq!(roll.active_cells(), 4);
//!
//! let notes = pipeline.decoder().decode(&roll);
//! assert_eq!(notes.len(), 1);
//! assert_eq!(notes[0].duration.quarter_length, 1.0);
//! ```

pub mod curate;
pub mod decode;
pub mod duration;
pub mod encode;
pub mod midi_writer;
pub mod note;
pub mod pipeline;
pub mod roll;
pub mod score;

pub use curate::{
    normalize_time_signatures, smush, smush_all, smush_directory, split_all, split_song,
    track_verdict, BatchReport, CurationRules, ProgramRange, SmushBatchReport, SmushReport,
    SplitReport, TrackVerdict,
};
pub use decode::RollDecoder;
pub use duration::{quarter_length_to_ticks, DurationCodec, DurationUnit, TiedDuration};
pub use encode::{EncodeReport, RollEncoder};
pub use midi_writer::{notes_to_midi, ExportOptions};
pub use note::{NoteEvent, Pitch, ScoreEvent, TimedNote};
pub use pipeline::{PartSelection, Pipeline};
pub use roll::{PianoRoll, RollGeometry};
pub use score::{parse_score, Part, Score};

use std::path::PathBuf;

/// Errors from piano-roll operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no instrument parts to parse")]
    NoInstrumentParts,

    #[error("piano roll shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("piano roll cell ({row}, {column}) holds {value}, expected 0 or 1")]
    NotBinary { row: usize, column: usize, value: u8 },

    #[error("piano roll row {row} has {len} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("nothing to merge")]
    NothingToMerge,

    #[error("invalid duration unit table: {0}")]
    InvalidUnitTable(String),

    #[error("roll grid has {geometry} ticks per quarter, duration codec has {codec}")]
    ResolutionMismatch { geometry: u32, codec: u32 },

    #[error("piano roll JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
