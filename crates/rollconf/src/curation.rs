//! Track curation rules and MIDI export settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive, 1-indexed GM program range, written `[first, last]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRange {
    pub first: u8,
    pub last: u8,
}

impl FamilyRange {
    pub const fn new(first: u8, last: u8) -> Self {
        Self { first, last }
    }
}

/// Which tracks survive splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationConfig {
    /// Instrument family name to program range.
    #[serde(default = "CurationConfig::default_families")]
    pub families: BTreeMap<String, FamilyRange>,

    /// Families whose tracks are kept.
    /// Default: ["Guitar"]
    #[serde(default = "CurationConfig::default_allowed")]
    pub allowed: Vec<String>,

    /// Default: [1, 2, 4]
    #[serde(default = "CurationConfig::default_numerators")]
    pub numerators: Vec<u8>,

    /// Default: 4
    #[serde(default = "CurationConfig::default_denominator")]
    pub denominator: u8,

    /// 0-indexed drum channel.
    /// Default: 9
    #[serde(default = "CurationConfig::default_percussion_channel")]
    pub percussion_channel: u8,

    /// Tracks with fewer events are skipped as empty.
    /// Default: 10
    #[serde(default = "CurationConfig::default_min_track_events")]
    pub min_track_events: usize,
}

impl CurationConfig {
    fn default_families() -> BTreeMap<String, FamilyRange> {
        [
            ("Piano", 1, 8),
            ("Chromatic Percussion", 9, 16),
            ("Organ", 17, 24),
            ("Guitar", 25, 32),
            ("Bass", 33, 40),
            ("Strings", 41, 48),
            ("Ensemble", 49, 56),
            ("Brass", 57, 64),
        ]
        .into_iter()
        .map(|(name, first, last)| (name.to_string(), FamilyRange::new(first, last)))
        .collect()
    }

    fn default_allowed() -> Vec<String> {
        vec!["Guitar".to_string()]
    }

    fn default_numerators() -> Vec<u8> {
        vec![1, 2, 4]
    }

    fn default_denominator() -> u8 {
        4
    }

    fn default_percussion_channel() -> u8 {
        9
    }

    fn default_min_track_events() -> usize {
        10
    }
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            families: Self::default_families(),
            allowed: Self::default_allowed(),
            numerators: Self::default_numerators(),
            denominator: Self::default_denominator(),
            percussion_channel: Self::default_percussion_channel(),
            min_track_events: Self::default_min_track_events(),
        }
    }
}

/// How decoded rolls are written back to MIDI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default: 480
    #[serde(default = "ExportConfig::default_ticks_per_beat")]
    pub ticks_per_beat: u16,

    /// Default: 90
    #[serde(default = "ExportConfig::default_velocity")]
    pub velocity: u8,

    /// Default: 120
    #[serde(default = "ExportConfig::default_tempo_bpm")]
    pub tempo_bpm: f64,

    /// 0-indexed GM program for the note track; none by default.
    #[serde(default)]
    pub program: Option<u8>,
}

impl ExportConfig {
    fn default_ticks_per_beat() -> u16 {
        480
    }

    fn default_velocity() -> u8 {
        90
    }

    fn default_tempo_bpm() -> f64 {
        120.0
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: Self::default_ticks_per_beat(),
            velocity: Self::default_velocity(),
            tempo_bpm: Self::default_tempo_bpm(),
            program: None,
        }
    }
}
