//! The binary occupancy matrix and its geometry.

use crate::note::Pitch;
use crate::{Error, Result};
use ndarray::{Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

/// Fixed dimensions and resolution of a piano roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollGeometry {
    /// One row per semitone. Default: 72 (six octaves).
    pub pitch_rows: usize,
    /// One column per tick. Default: 7000.
    pub time_steps: usize,
    /// Grid resolution. Default: 4 (sixteenth notes).
    pub ticks_per_quarter: u32,
    /// MIDI note of row 0. Default: 40 (E2).
    pub lowest_midi_note: u8,
}

impl Default for RollGeometry {
    fn default() -> Self {
        Self {
            pitch_rows: 72,
            time_steps: 7000,
            ticks_per_quarter: 4,
            lowest_midi_note: 40,
        }
    }
}

impl RollGeometry {
    /// Row for a pitch, or `None` when it falls outside the roll.
    pub fn pitch_index(&self, pitch: Pitch) -> Option<usize> {
        let index = pitch.midi_number() - i32::from(self.lowest_midi_note);
        if index < 0 {
            return None;
        }
        let index = index as usize;
        (index < self.pitch_rows).then_some(index)
    }

    /// Inverse of [`pitch_index`](Self::pitch_index). `None` when the row
    /// lies past the highest octave a [`Pitch`] can name.
    pub fn pitch_at(&self, index: usize) -> Option<Pitch> {
        let midi = i32::try_from(index).ok()? + i32::from(self.lowest_midi_note);
        Some(Pitch {
            pitch_class: midi.rem_euclid(12) as u8,
            octave: i8::try_from(midi.div_euclid(12) - 1).ok()?,
        })
    }

    /// `round(q * ticks_per_quarter)`; values finer than one tick are quantized.
    pub fn quarter_length_to_ticks(&self, quarter_length: f64) -> i64 {
        (quarter_length * self.ticks_per_quarter as f64).round() as i64
    }

    pub fn ticks_to_quarter_length(&self, ticks: usize) -> f64 {
        ticks as f64 / self.ticks_per_quarter as f64
    }

    /// Latest representable offset, exclusive.
    pub fn max_quarter_length(&self) -> f64 {
        self.ticks_to_quarter_length(self.time_steps)
    }
}

/// Binary pitch × tick occupancy matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PianoRoll {
    cells: Array2<u8>,
}

impl PianoRoll {
    pub fn zeros(geometry: &RollGeometry) -> Self {
        Self::with_shape(geometry.pitch_rows, geometry.time_steps)
    }

    pub fn with_shape(rows: usize, columns: usize) -> Self {
        Self {
            cells: Array2::zeros((rows, columns)),
        }
    }

    /// (pitch rows, time steps)
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn columns(&self) -> usize {
        self.cells.ncols()
    }

    pub fn get(&self, row: usize, column: usize) -> bool {
        self.cells.get((row, column)).is_some_and(|&v| v != 0)
    }

    /// Mark a cell active. Returns false if it lies outside the roll.
    pub fn set(&mut self, row: usize, column: usize) -> bool {
        match self.cells.get_mut((row, column)) {
            Some(cell) => {
                *cell = 1;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, u8> {
        self.cells.row(row)
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.cells
    }

    pub fn active_cells(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }

    /// Cell-wise OR of `other` into `self`.
    pub fn merge_from(&mut self, other: &PianoRoll) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Zip::from(&mut self.cells)
            .and(&other.cells)
            .for_each(|a, &b| *a |= b);
        Ok(())
    }

    pub fn merged(&self, other: &PianoRoll) -> Result<PianoRoll> {
        let mut out = self.clone();
        out.merge_from(other)?;
        Ok(out)
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    /// Build a roll from nested rows, rejecting ragged or non-binary input.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut cells = Array2::zeros((rows.len(), width));

        for (r, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(Error::RaggedRows {
                    row: r,
                    len: row.len(),
                    expected: width,
                });
            }
            for (c, &value) in row.iter().enumerate() {
                if value > 1 {
                    return Err(Error::NotBinary {
                        row: r,
                        column: c,
                        value,
                    });
                }
                cells[(r, c)] = value;
            }
        }

        Ok(Self { cells })
    }

    /// Serialize as a JSON array of rows.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_rows())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<Vec<u8>> = serde_json::from_str(json)?;
        Self::from_rows(rows)
    }
}

impl Serialize for PianoRoll {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PianoRoll {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let rows = Vec::<Vec<u8>>::deserialize(deserializer)?;
        PianoRoll::from_rows(rows).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_geometry_matches_pitch_formula() {
        let g = RollGeometry::default();
        // (pitch_class - 4) + 12 * (octave - 2)
        assert_eq!(g.pitch_index(Pitch::new(4, 4)), Some(24));
        assert_eq!(g.pitch_index(Pitch::new(4, 2)), Some(0));
        assert_eq!(g.pitch_index(Pitch::new(3, 8)), Some(71));
        assert_eq!(g.pitch_index(Pitch::new(3, 2)), None);
        assert_eq!(g.pitch_index(Pitch::new(4, 8)), None);
    }

    #[test]
    fn pitch_index_is_a_bijection() {
        let g = RollGeometry::default();
        for octave in 2..=7i8 {
            for pitch_class in 0..12u8 {
                let pitch = Pitch::new(pitch_class, octave);
                if let Some(index) = g.pitch_index(pitch) {
                    assert_eq!(g.pitch_at(index), Some(pitch));
                }
            }
        }
        for index in 0..72 {
            let p = g.pitch_at(index).unwrap();
            assert_eq!(g.pitch_index(p), Some(index));
            // Decoder form: octave = (p + 4) / 12 + 2, class = (p % 12 + 4) % 12
            assert_eq!(p.octave as usize, (index + 4) / 12 + 2);
            assert_eq!(p.pitch_class as usize, ((index % 12) + 4) % 12);
        }
    }

    #[test]
    fn rows_past_octave_range_have_no_pitch() {
        let g = RollGeometry::default();
        // MIDI 1547 is the last note with an octave that fits in i8
        assert_eq!(g.pitch_at(1507), Some(Pitch::new(11, 127)));
        assert_eq!(g.pitch_at(1508), None);
        assert_eq!(g.pitch_at(usize::MAX), None);
    }

    #[test]
    fn set_outside_is_rejected() {
        let mut roll = PianoRoll::with_shape(2, 3);
        assert!(roll.set(1, 2));
        assert!(!roll.set(2, 0));
        assert!(!roll.set(0, 3));
        assert!(roll.get(1, 2));
        assert!(!roll.get(5, 5));
        assert_eq!(roll.active_cells(), 1);
    }

    #[test]
    fn merge_is_idempotent_and_commutative() {
        let mut a = PianoRoll::with_shape(3, 4);
        a.set(0, 0);
        a.set(2, 3);
        let mut b = PianoRoll::with_shape(3, 4);
        b.set(0, 0);
        b.set(1, 1);

        assert_eq!(a.merged(&a).unwrap(), a);
        assert_eq!(a.merged(&b).unwrap(), b.merged(&a).unwrap());
        assert_eq!(a.merged(&b).unwrap().active_cells(), 3);
    }

    #[test]
    fn merge_rejects_other_shapes() {
        let mut a = PianoRoll::with_shape(3, 4);
        let b = PianoRoll::with_shape(3, 5);
        assert!(matches!(
            a.merge_from(&b),
            Err(Error::ShapeMismatch { expected: (3, 4), actual: (3, 5) })
        ));
    }

    #[test]
    fn json_interchange() {
        let mut roll = PianoRoll::with_shape(2, 3);
        roll.set(0, 1);
        roll.set(1, 2);
        let json = roll.to_json().unwrap();
        assert_eq!(json, "[[0,1,0],[0,0,1]]");
        assert_eq!(PianoRoll::from_json(&json).unwrap(), roll);
    }

    #[test]
    fn from_rows_validates() {
        assert!(matches!(
            PianoRoll::from_rows(vec![vec![0, 1], vec![1]]),
            Err(Error::RaggedRows { row: 1, len: 1, expected: 2 })
        ));
        assert!(matches!(
            PianoRoll::from_rows(vec![vec![0, 2]]),
            Err(Error::NotBinary { row: 0, column: 1, value: 2 })
        ));
    }
}
