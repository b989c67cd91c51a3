//! Piano-roll matrix to note events.

use crate::duration::DurationCodec;
use crate::note::NoteEvent;
use crate::roll::{PianoRoll, RollGeometry};
use crate::{Error, Result};
use tracing::{debug, warn};

/// Rebuilds one note per maximal run of active ticks.
#[derive(Debug, Clone, Default)]
pub struct RollDecoder {
    geometry: RollGeometry,
    codec: DurationCodec,
}

impl RollDecoder {
    /// Offsets come from the geometry and durations from the codec, so both
    /// must count the same ticks per quarter.
    pub fn new(geometry: RollGeometry, codec: DurationCodec) -> Result<Self> {
        if geometry.ticks_per_quarter != codec.ticks_per_quarter() {
            return Err(Error::ResolutionMismatch {
                geometry: geometry.ticks_per_quarter,
                codec: codec.ticks_per_quarter(),
            });
        }
        Ok(Self { geometry, codec })
    }

    pub fn geometry(&self) -> &RollGeometry {
        &self.geometry
    }

    pub fn codec(&self) -> &DurationCodec {
        &self.codec
    }

    /// Scan every row left to right, emitting notes in row-major then
    /// offset order. No chord grouping is reconstructed.
    pub fn decode(&self, roll: &PianoRoll) -> Vec<NoteEvent> {
        let mut notes = Vec::new();

        for (row_index, row) in roll.as_array().rows().into_iter().enumerate() {
            let Some(pitch) = self.geometry.pitch_at(row_index) else {
                if row.iter().any(|&cell| cell != 0) {
                    warn!(row = row_index, "row has no nameable pitch, skipping");
                }
                continue;
            };
            let width = row.len();
            let mut column = 0;

            while column < width {
                if row[column] == 0 {
                    column += 1;
                    continue;
                }

                let mut count = 1;
                while column + count < width && row[column + count] != 0 {
                    count += 1;
                }

                notes.push(NoteEvent {
                    pitch_index: row_index,
                    pitch,
                    offset: self.geometry.ticks_to_quarter_length(column),
                    duration: self.codec.tied_duration(count as i64),
                });

                column += count;
            }
        }

        debug!(notes = notes.len(), "decoded piano roll");
        notes
    }
}
