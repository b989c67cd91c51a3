//! Canonical note durations and run-length decomposition.
//!
//! A run of active ticks in a piano-roll row is rebuilt into named note
//! values by greedy largest-first decomposition. The canonical units are
//! successive doublings of a sixteenth note, so greedy is also minimal.

use crate::roll::RollGeometry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default grid resolution: one tick per sixteenth note.
pub const TICKS_PER_QUARTER: u32 = 4;

/// A named note value, measured in sixteenth-note ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Maxima,
    Longa,
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    #[serde(rename = "16th")]
    Sixteenth,
    /// Zero-length sentinel; never chosen as a step for positive runs.
    Zero,
}

impl DurationUnit {
    /// All units, longest first.
    pub const CANONICAL: [DurationUnit; 9] = [
        DurationUnit::Maxima,
        DurationUnit::Longa,
        DurationUnit::Breve,
        DurationUnit::Whole,
        DurationUnit::Half,
        DurationUnit::Quarter,
        DurationUnit::Eighth,
        DurationUnit::Sixteenth,
        DurationUnit::Zero,
    ];

    pub const fn ticks(self) -> u32 {
        match self {
            DurationUnit::Maxima => 128,
            DurationUnit::Longa => 64,
            DurationUnit::Breve => 32,
            DurationUnit::Whole => 16,
            DurationUnit::Half => 8,
            DurationUnit::Quarter => 4,
            DurationUnit::Eighth => 2,
            DurationUnit::Sixteenth => 1,
            DurationUnit::Zero => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DurationUnit::Maxima => "maxima",
            DurationUnit::Longa => "longa",
            DurationUnit::Breve => "breve",
            DurationUnit::Whole => "whole",
            DurationUnit::Half => "half",
            DurationUnit::Quarter => "quarter",
            DurationUnit::Eighth => "eighth",
            DurationUnit::Sixteenth => "16th",
            DurationUnit::Zero => "zero",
        }
    }

    /// Length in quarter notes on the default grid.
    pub fn quarter_length(self) -> f64 {
        f64::from(self.ticks()) / f64::from(TICKS_PER_QUARTER)
    }

    /// Look up a unit by note-value name.
    ///
    /// `32nd` and `64th` fall below the grid and map to [`DurationUnit::Zero`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "maxima" => Some(DurationUnit::Maxima),
            "longa" => Some(DurationUnit::Longa),
            "breve" => Some(DurationUnit::Breve),
            "whole" => Some(DurationUnit::Whole),
            "half" => Some(DurationUnit::Half),
            "quarter" => Some(DurationUnit::Quarter),
            "eighth" => Some(DurationUnit::Eighth),
            "16th" => Some(DurationUnit::Sixteenth),
            "32nd" | "64th" | "zero" => Some(DurationUnit::Zero),
            _ => None,
        }
    }

    pub fn from_ticks(ticks: u32) -> Option<Self> {
        Self::CANONICAL.iter().copied().find(|u| u.ticks() == ticks)
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A duration built from one or more tied units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiedDuration {
    pub components: Vec<DurationUnit>,
    pub quarter_length: f64,
}

impl TiedDuration {
    /// Total length in grid ticks.
    pub fn ticks(&self) -> u32 {
        self.components.iter().map(|u| u.ticks()).sum()
    }

    /// True when more than one unit must be tied together.
    pub fn is_tied(&self) -> bool {
        self.components.len() > 1
    }
}

/// Converts between quarter lengths, grid ticks and named durations.
#[derive(Debug, Clone)]
pub struct DurationCodec {
    units: Vec<DurationUnit>,
    ticks_per_quarter: u32,
}

impl Default for DurationCodec {
    fn default() -> Self {
        Self {
            units: DurationUnit::CANONICAL.to_vec(),
            ticks_per_quarter: TICKS_PER_QUARTER,
        }
    }
}

impl DurationCodec {
    /// Build a codec over a custom unit table.
    ///
    /// The table must be strictly descending and contain the one-tick unit,
    /// otherwise some run lengths would have no decomposition.
    pub fn new(units: Vec<DurationUnit>, ticks_per_quarter: u32) -> Result<Self> {
        if ticks_per_quarter == 0 {
            return Err(Error::InvalidUnitTable(
                "ticks per quarter must be positive".to_string(),
            ));
        }
        if units.is_empty() {
            return Err(Error::InvalidUnitTable("no units".to_string()));
        }
        if !units.windows(2).all(|w| w[0].ticks() > w[1].ticks()) {
            return Err(Error::InvalidUnitTable(format!(
                "units must be strictly descending: {:?}",
                units
            )));
        }
        if !units.iter().any(|u| u.ticks() == 1) {
            return Err(Error::InvalidUnitTable(format!(
                "a one-tick unit is required: {:?}",
                units
            )));
        }
        Ok(Self {
            units,
            ticks_per_quarter,
        })
    }

    pub fn units(&self) -> &[DurationUnit] {
        &self.units
    }

    pub fn ticks_per_quarter(&self) -> u32 {
        self.ticks_per_quarter
    }

    /// Greedy largest-first decomposition of a run of `run_length` ticks.
    ///
    /// Non-positive lengths yield `[Zero]`.
    pub fn decompose_run_length(&self, run_length: i64) -> Vec<DurationUnit> {
        if run_length <= 0 {
            warn!(run_length, "non-positive run length, emitting zero-length unit");
            return vec![DurationUnit::Zero];
        }

        let mut remaining = run_length as u64;
        let mut parts = Vec::new();

        while remaining > 0 {
            if let Some(exact) = self
                .units
                .iter()
                .copied()
                .find(|u| u64::from(u.ticks()) == remaining)
            {
                parts.push(exact);
                break;
            }

            let step = self
                .units
                .iter()
                .copied()
                .find(|u| u.ticks() > 0 && u64::from(u.ticks()) < remaining);

            let Some(unit) = step else {
                unreachable!(
                    "unit table {:?} cannot cover {} remaining ticks",
                    self.units, remaining
                );
            };

            parts.push(unit);
            remaining -= u64::from(unit.ticks());
        }

        parts
    }

    /// Decompose a run and attach its total quarter length.
    pub fn tied_duration(&self, run_length: i64) -> TiedDuration {
        let components = self.decompose_run_length(run_length);
        let quarter_length = components
            .iter()
            .map(|u| u.ticks() as f64 / self.ticks_per_quarter as f64)
            .sum();
        TiedDuration {
            components,
            quarter_length,
        }
    }
}

/// Quantize a quarter length onto the default sixteenth-note grid.
pub fn quarter_length_to_ticks(quarter_length: f64) -> i64 {
    RollGeometry::default().quarter_length_to_ticks(quarter_length)
}
