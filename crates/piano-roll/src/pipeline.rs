//! End-to-end conversions between MIDI files and piano rolls.

use crate::decode::RollDecoder;
use crate::duration::DurationCodec;
use crate::encode::{EncodeReport, RollEncoder};
use crate::midi_writer::{notes_to_midi, ExportOptions};
use crate::note::{NoteEvent, ScoreEvent};
use crate::roll::{PianoRoll, RollGeometry};
use crate::score::parse_score;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Which instrument parts of a file feed the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartSelection {
    /// Only the first part, by first onset.
    #[default]
    FirstPart,
    /// Every part merged into one stream.
    AllParts,
}

/// Encoder, decoder, and MIDI export settings bundled together.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    encoder: RollEncoder,
    decoder: RollDecoder,
    export: ExportOptions,
}

impl Pipeline {
    /// Fails when the codec and geometry disagree on ticks per quarter.
    pub fn new(
        geometry: RollGeometry,
        codec: DurationCodec,
        export: ExportOptions,
    ) -> Result<Self> {
        Ok(Self {
            encoder: RollEncoder::new(geometry),
            decoder: RollDecoder::new(geometry, codec)?,
            export,
        })
    }

    pub fn encoder(&self) -> &RollEncoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &RollDecoder {
        &self.decoder
    }

    pub fn export(&self) -> &ExportOptions {
        &self.export
    }

    /// Parse MIDI bytes and encode the selected parts.
    pub fn midi_to_roll(
        &self,
        midi_bytes: &[u8],
        selection: PartSelection,
    ) -> Result<(PianoRoll, EncodeReport)> {
        let score = parse_score(midi_bytes)?;

        let events: Vec<ScoreEvent> = match selection {
            PartSelection::FirstPart => score
                .first_part()
                .ok_or(Error::NoInstrumentParts)?
                .events
                .clone(),
            PartSelection::AllParts => {
                if score.parts.is_empty() {
                    return Err(Error::NoInstrumentParts);
                }
                score.flatten()
            }
        };

        debug!(
            parts = score.parts.len(),
            events = events.len(),
            ?selection,
            "encoding score"
        );
        Ok(self.encoder.encode(&events))
    }

    /// Read a MIDI file and encode the selected parts.
    pub fn file_to_roll(
        &self,
        path: &Path,
        selection: PartSelection,
    ) -> Result<(PianoRoll, EncodeReport)> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        self.midi_to_roll(&bytes, selection)
    }

    pub fn roll_to_notes(&self, roll: &PianoRoll) -> Vec<NoteEvent> {
        self.decoder.decode(roll)
    }

    /// Decode a roll straight to MIDI bytes.
    pub fn roll_to_midi(&self, roll: &PianoRoll) -> Vec<u8> {
        notes_to_midi(&self.roll_to_notes(roll), &self.export)
    }

    /// Decode a roll and save it as a MIDI file, creating parent
    /// directories. Returns the number of notes written.
    pub fn write_roll_as_midi(&self, roll: &PianoRoll, path: &Path) -> Result<usize> {
        let notes = self.roll_to_notes(roll);
        let bytes = notes_to_midi(&notes, &self.export);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, bytes).map_err(|e| Error::io(path, e))?;

        info!(path = %path.display(), notes = notes.len(), "wrote MIDI");
        Ok(notes.len())
    }
}
