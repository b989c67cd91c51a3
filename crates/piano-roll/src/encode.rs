//! Note/chord events to piano-roll matrix.

use crate::note::ScoreEvent;
use crate::roll::{PianoRoll, RollGeometry};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Counts of what an encoding kept and what it lost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeReport {
    /// Events that started inside the roll.
    pub events_seen: usize,
    /// Pitches written into a row (chord members count individually).
    pub notes_written: usize,
    /// Pitches outside the roll's pitch range.
    pub pitches_dropped: usize,
    /// Index of the first event past the time budget, if any.
    pub truncated_at_event: Option<usize>,
    /// Cells of long notes cut off at the last column.
    pub cells_clamped: usize,
}

impl EncodeReport {
    pub fn is_lossless(&self) -> bool {
        self.pitches_dropped == 0 && self.truncated_at_event.is_none() && self.cells_clamped == 0
    }
}

/// Writes note events into a fresh [`PianoRoll`].
#[derive(Debug, Clone, Default)]
pub struct RollEncoder {
    geometry: RollGeometry,
}

impl RollEncoder {
    pub fn new(geometry: RollGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &RollGeometry {
        &self.geometry
    }

    /// Encode events, which must be ordered by offset.
    ///
    /// Encoding stops at the first event starting at or beyond the last
    /// column. Pitches outside the roll are skipped and notes running past
    /// the last column are clamped; all three are counted in the report.
    pub fn encode(&self, events: &[ScoreEvent]) -> (PianoRoll, EncodeReport) {
        let mut roll = PianoRoll::zeros(&self.geometry);
        let mut report = EncodeReport::default();
        let time_steps = self.geometry.time_steps as i64;

        for (index, event) in events.iter().enumerate() {
            let tick = self.geometry.quarter_length_to_ticks(event.offset());
            if tick >= time_steps {
                report.truncated_at_event = Some(index);
                break;
            }
            report.events_seen += 1;

            // Computed once so chord members share the same span
            let instances = self.geometry.quarter_length_to_ticks(event.duration()).max(0);
            let start = tick.max(0);
            let stop = tick.saturating_add(instances);
            let end = stop.min(time_steps);
            let clamped = usize::try_from(stop - end).unwrap_or(usize::MAX);

            for &pitch in event.pitches() {
                let Some(row) = self.geometry.pitch_index(pitch) else {
                    report.pitches_dropped += 1;
                    continue;
                };
                for column in start..end {
                    roll.set(row, column as usize);
                }
                report.cells_clamped = report.cells_clamped.saturating_add(clamped);
                report.notes_written += 1;
            }
        }

        debug!(
            events = report.events_seen,
            notes = report.notes_written,
            dropped = report.pitches_dropped,
            clamped = report.cells_clamped,
            truncated_at = ?report.truncated_at_event,
            "encoded piano roll"
        );

        (roll, report)
    }
}
