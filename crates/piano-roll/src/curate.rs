//! Dataset curation: split multi-track songs into single-instrument track
//! files, and merge ("smush") a song's tracks back into one roll.
//!
//! Layout under a base directory:
//!
//! ```text
//! Songs/<song>.mid
//! Tracks/<song>/<song>_1.mid, <song>_2.mid, ...
//! Smushed/<song>.mid
//! ```

use crate::pipeline::{PartSelection, Pipeline};
use crate::roll::PianoRoll;
use crate::{Error, Result};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEventKind};
use rayon::prelude::*;
use rollconf::{CurationConfig, FamilyRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Inclusive range of 1-indexed GM program numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRange {
    pub first: u8,
    pub last: u8,
}

impl ProgramRange {
    pub const fn new(first: u8, last: u8) -> Self {
        Self { first, last }
    }

    /// Whether a 0-indexed program-change value falls in this range.
    pub fn contains_program(&self, program: u8) -> bool {
        let number = u16::from(program) + 1;
        u16::from(self.first) <= number && number <= u16::from(self.last)
    }
}

impl From<FamilyRange> for ProgramRange {
    fn from(range: FamilyRange) -> Self {
        Self::new(range.first, range.last)
    }
}

/// Which tracks survive splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationRules {
    pub families: BTreeMap<String, ProgramRange>,
    /// Family names whose programs are accepted.
    pub allowed: Vec<String>,
    pub required_denominator: u8,
    pub allowed_numerators: Vec<u8>,
    /// 0-indexed channel whose note-ons disqualify a track.
    pub percussion_channel: u8,
    /// Tracks with fewer events are treated as empty.
    pub min_track_events: usize,
}

impl From<&CurationConfig> for CurationRules {
    fn from(config: &CurationConfig) -> Self {
        Self {
            families: config
                .families
                .iter()
                .map(|(name, range)| (name.clone(), ProgramRange::from(*range)))
                .collect(),
            allowed: config.allowed.clone(),
            required_denominator: config.denominator,
            allowed_numerators: config.numerators.clone(),
            percussion_channel: config.percussion_channel,
            min_track_events: config.min_track_events,
        }
    }
}

/// The GM family table and thresholds from `rollconf`'s compiled defaults.
impl Default for CurationRules {
    fn default() -> Self {
        Self::from(&CurationConfig::default())
    }
}

impl CurationRules {
    /// Whether a 0-indexed program belongs to any allowed family.
    /// Unknown family names match nothing.
    pub fn allows_program(&self, program: u8) -> bool {
        self.allowed
            .iter()
            .filter_map(|name| self.families.get(name))
            .any(|range| range.contains_program(program))
    }
}

/// Why a track was kept or skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TrackVerdict {
    Keep,
    Percussion,
    Meter { numerator: u8, denominator: u8 },
    /// 0-indexed program outside every allowed family.
    Program { program: u8 },
    TooShort { events: usize },
}

impl TrackVerdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, TrackVerdict::Keep)
    }
}

/// Judge a track against the rules; the first failing event decides.
pub fn track_verdict(track: &Track, rules: &CurationRules) -> TrackVerdict {
    for event in track {
        match event.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { .. },
            } if channel.as_int() == rules.percussion_channel => {
                return TrackVerdict::Percussion;
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denom_pow, _, _)) => {
                let denominator = 1u32.checked_shl(u32::from(denom_pow)).unwrap_or(0);
                if denominator != u32::from(rules.required_denominator)
                    || !rules.allowed_numerators.contains(&numerator)
                {
                    return TrackVerdict::Meter {
                        numerator,
                        denominator: u8::try_from(denominator).unwrap_or(0),
                    };
                }
            }
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } if !rules.allows_program(program.as_int()) => {
                return TrackVerdict::Program {
                    program: program.as_int(),
                };
            }
            _ => {}
        }
    }

    if track.len() < rules.min_track_events {
        return TrackVerdict::TooShort {
            events: track.len(),
        };
    }

    TrackVerdict::Keep
}

/// Rewrite every time signature in the file as 4/4.
pub fn normalize_time_signatures(smf: &mut Smf) {
    for track in smf.tracks.iter_mut() {
        for event in track.iter_mut() {
            if let TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) =
                &mut event.kind
            {
                *num = 4;
                *denom_pow = 2;
            }
        }
    }
}

/// Song name used for output directories and files.
pub fn song_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "song".to_string())
}

/// Outcome of splitting one song.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    pub song: String,
    pub ticks_per_beat: Option<u16>,
    pub tracks_total: usize,
    pub written: Vec<PathBuf>,
    /// (track index, reason) for every skipped track.
    pub skipped: Vec<(usize, TrackVerdict)>,
}

/// Split a song into one single-track file per surviving track.
///
/// Files land in `tracks_root/<song>/<song>_<n>.mid`, numbered from 1 over
/// kept tracks. Meter rules are judged on the signatures as written; kept
/// tracks are saved with every signature normalized to 4/4.
pub fn split_song(path: &Path, tracks_root: &Path, rules: &CurationRules) -> Result<SplitReport> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let mut smf = Smf::parse(&bytes).map_err(|e| Error::MidiParse(e.to_string()))?;

    let verdicts: Vec<TrackVerdict> = smf
        .tracks
        .iter()
        .map(|track| track_verdict(track, rules))
        .collect();

    normalize_time_signatures(&mut smf);

    let song = song_name(path);
    let song_dir = tracks_root.join(&song);
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(t) => Some(t.as_int()),
        Timing::Timecode(_, _) => None,
    };

    let mut written = Vec::new();
    let mut skipped = Vec::new();

    for (index, (track, verdict)) in smf.tracks.iter().zip(verdicts).enumerate() {
        if !verdict.is_keep() {
            debug!(song = %song, track = index, ?verdict, "skipping track");
            skipped.push((index, verdict));
            continue;
        }

        fs::create_dir_all(&song_dir).map_err(|e| Error::io(&song_dir, e))?;
        let out_path = song_dir.join(format!("{}_{}.mid", song, written.len() + 1));

        let single = Smf {
            header: Header::new(Format::SingleTrack, smf.header.timing),
            tracks: vec![track.clone()],
        };
        single.save(&out_path).map_err(|e| Error::io(&out_path, e))?;

        info!(path = %out_path.display(), "saved track");
        written.push(out_path);
    }

    info!(
        song = %song,
        kept = written.len(),
        total = smf.tracks.len(),
        ?ticks_per_beat,
        "separated tracks"
    );

    Ok(SplitReport {
        song,
        ticks_per_beat,
        tracks_total: smf.tracks.len(),
        written,
        skipped,
    })
}

/// Outcome of splitting a directory of songs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub songs: Vec<SplitReport>,
    /// (song path, error message) for songs that could not be split.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn tracks_written(&self) -> usize {
        self.songs.iter().map(|s| s.written.len()).sum()
    }
}

/// Split every file in `songs_dir` in parallel.
///
/// Per-song failures are logged and collected; they never abort the batch.
pub fn split_all(songs_dir: &Path, tracks_root: &Path, rules: &CurationRules) -> Result<BatchReport> {
    let mut files = list_files(songs_dir, None)?;
    files.sort();

    let results: Vec<(PathBuf, Result<SplitReport>)> = files
        .into_par_iter()
        .map(|path| {
            let result = split_song(&path, tracks_root, rules);
            (path, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok(song) => report.songs.push(song),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "can't split song, skipping");
                report.failed.push((path, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Cell-wise OR of equally shaped rolls.
pub fn smush(rolls: &[PianoRoll]) -> Result<PianoRoll> {
    let (first, rest) = rolls.split_first().ok_or(Error::NothingToMerge)?;
    let mut merged = first.clone();
    for roll in rest {
        merged.merge_from(roll)?;
    }
    Ok(merged)
}

/// Outcome of merging a directory of tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmushReport {
    pub inputs: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub notes_written: usize,
    pub output: PathBuf,
}

/// Encode every `.mid` in `track_dir`, OR-merge the rolls, and write the
/// decoded result to `out_path`.
///
/// Files that fail to parse or have no instrument parts are logged and
/// skipped. Returns `None` when no file produced a roll.
pub fn smush_directory(
    track_dir: &Path,
    out_path: &Path,
    pipeline: &Pipeline,
) -> Result<Option<SmushReport>> {
    let mut files = list_files(track_dir, Some("mid"))?;
    files.sort();

    let mut rolls = Vec::new();
    let mut inputs = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        match pipeline.file_to_roll(&path, PartSelection::FirstPart) {
            Ok((roll, _)) => {
                rolls.push(roll);
                inputs.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping track");
                skipped.push(path);
            }
        }
    }

    if rolls.is_empty() {
        warn!(dir = %track_dir.display(), "no tracks to smush");
        return Ok(None);
    }

    let merged = smush(&rolls)?;
    let notes_written = pipeline.write_roll_as_midi(&merged, out_path)?;
    info!(path = %out_path.display(), inputs = inputs.len(), notes = notes_written, "saved smushed song");

    Ok(Some(SmushReport {
        inputs,
        skipped,
        notes_written,
        output: out_path.to_path_buf(),
    }))
}

/// Outcome of smushing every song under a tracks root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmushBatchReport {
    pub merged: Vec<SmushReport>,
    /// Song directories with no usable track.
    pub empty: Vec<PathBuf>,
    /// (song directory, error message) for songs that could not be merged.
    pub failed: Vec<(PathBuf, String)>,
}

/// Smush every `tracks_root/<song>/` into `smushed_root/<song>.mid`.
///
/// Empty or failing song directories are logged and counted; they never
/// abort the batch.
pub fn smush_all(
    tracks_root: &Path,
    smushed_root: &Path,
    pipeline: &Pipeline,
) -> Result<SmushBatchReport> {
    let mut dirs = list_dirs(tracks_root)?;
    dirs.sort();

    let results: Vec<(PathBuf, Result<Option<SmushReport>>)> = dirs
        .into_par_iter()
        .map(|dir| {
            let out_path = smushed_root.join(format!("{}.mid", song_name(&dir)));
            let result = smush_directory(&dir, &out_path, pipeline);
            (dir, result)
        })
        .collect();

    let mut report = SmushBatchReport::default();
    for (dir, result) in results {
        match result {
            Ok(Some(song)) => report.merged.push(song),
            Ok(None) => report.empty.push(dir),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "can't smush song, skipping");
                report.failed.push((dir, e.to_string()));
            }
        }
    }

    info!(
        merged = report.merged.len(),
        empty = report.empty.len(),
        failed = report.failed.len(),
        "smushed songs"
    );
    Ok(report)
}

/// Subdirectories of `dir`.
fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut dirs = Vec::new();

    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    Ok(dirs)
}

/// Regular files in `dir`, optionally filtered by extension.
fn list_files(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = extension {
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
        }
        files.push(path);
    }

    Ok(files)
}
