//! CLI command implementations

use anyhow::{bail, Context, Result};
use piano_roll::{PartSelection, PianoRoll};
use rollconf::{ConfigSources, RollConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::settings;

fn selection(all_parts: bool) -> PartSelection {
    if all_parts {
        PartSelection::AllParts
    } else {
        PartSelection::FirstPart
    }
}

/// A song argument is either a path to a file or a name in Songs/.
fn resolve_song(config: &RollConfig, song: &str) -> PathBuf {
    let as_path = PathBuf::from(song);
    if as_path.is_file() {
        return as_path;
    }
    let in_songs = config.paths.songs().join(song);
    if in_songs.extension().is_none() {
        in_songs.with_extension("mid")
    } else {
        in_songs
    }
}

/// Split one song, or every song in Songs/
pub fn split(config: &RollConfig, song: Option<&str>) -> Result<()> {
    let rules = settings::curation_rules(config);
    let tracks_root = config.paths.tracks();

    match song {
        Some(song) => {
            let path = resolve_song(config, song);
            let report = piano_roll::split_song(&path, &tracks_root, &rules)
                .with_context(|| format!("Failed to split {}", path.display()))?;
            for (track, verdict) in &report.skipped {
                info!(track, ?verdict, "skipped");
            }
            println!(
                "{}: kept {} of {} tracks",
                report.song,
                report.written.len(),
                report.tracks_total
            );
        }
        None => {
            let songs_dir = config.paths.songs();
            let report = piano_roll::split_all(&songs_dir, &tracks_root, &rules)
                .with_context(|| format!("Failed to read {}", songs_dir.display()))?;
            println!(
                "split {} songs into {} tracks, {} failed",
                report.songs.len(),
                report.tracks_written(),
                report.failed.len()
            );
        }
    }

    Ok(())
}

/// Encode a MIDI file and write the roll as JSON
pub fn encode(
    config: &RollConfig,
    midi: &Path,
    output: Option<&Path>,
    all_parts: bool,
) -> Result<()> {
    let pipeline = settings::pipeline(config)?;
    let (roll, report) = pipeline
        .file_to_roll(midi, selection(all_parts))
        .with_context(|| format!("Failed to encode {}", midi.display()))?;

    if !report.is_lossless() {
        warn!(
            dropped = report.pitches_dropped,
            clamped = report.cells_clamped,
            truncated_at = ?report.truncated_at_event,
            "encoding lost notes"
        );
    }

    let json = roll.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), cells = roll.active_cells(), "wrote piano roll");
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Read a JSON roll and write it as MIDI
pub fn decode(config: &RollConfig, json: &Path, output: &Path) -> Result<()> {
    let text = fs::read_to_string(json)
        .with_context(|| format!("Failed to read {}", json.display()))?;
    let roll = PianoRoll::from_json(&text)
        .with_context(|| format!("{} is not a piano roll", json.display()))?;

    let pipeline = settings::pipeline(config)?;
    let expected = pipeline.decoder().geometry();
    if roll.shape() != (expected.pitch_rows, expected.time_steps) {
        warn!(shape = ?roll.shape(), "piano roll has non-default shape");
    }

    let notes = pipeline.write_roll_as_midi(&roll, output)?;
    println!("wrote {} notes to {}", notes, output.display());
    Ok(())
}

/// Merge Tracks/<song>/ into Smushed/<song>.mid, or every song in Tracks/
pub fn smush(config: &RollConfig, song: Option<&str>) -> Result<()> {
    let pipeline = settings::pipeline(config)?;

    match song {
        Some(song) => {
            let track_dir = config.paths.song_tracks(song);
            let out_path = config.paths.smushed_song(song);

            let Some(report) = piano_roll::smush_directory(&track_dir, &out_path, &pipeline)
                .with_context(|| format!("Failed to smush {}", track_dir.display()))?
            else {
                bail!("No usable tracks in {}", track_dir.display());
            };

            println!(
                "merged {} tracks ({} skipped) into {}",
                report.inputs.len(),
                report.skipped.len(),
                report.output.display()
            );
        }
        None => {
            let tracks_root = config.paths.tracks();
            let report = piano_roll::smush_all(&tracks_root, &config.paths.smushed(), &pipeline)
                .with_context(|| format!("Failed to read {}", tracks_root.display()))?;
            println!(
                "smushed {} songs, {} without usable tracks, {} failed",
                report.merged.len(),
                report.empty.len(),
                report.failed.len()
            );
        }
    }

    Ok(())
}

/// Encode a MIDI file and decode it straight back
pub fn roundtrip(config: &RollConfig, midi: &Path, output: &Path, all_parts: bool) -> Result<()> {
    let pipeline = settings::pipeline(config)?;
    let (roll, report) = pipeline
        .file_to_roll(midi, selection(all_parts))
        .with_context(|| format!("Failed to encode {}", midi.display()))?;
    let notes = pipeline.write_roll_as_midi(&roll, output)?;

    println!(
        "{} notes in, {} notes out{}",
        report.notes_written,
        notes,
        if report.is_lossless() { "" } else { " (lossy)" }
    );
    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &RollConfig, sources: &ConfigSources) {
    for file in &sources.files {
        println!("# loaded {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# overridden by ${}", var);
    }
    print!("{}", config.to_toml());
}
