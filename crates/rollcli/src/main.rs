//! roll - piano-roll encoding, decoding and dataset curation
//!
//! Subcommands:
//! - `roll split [SONG]` - Split songs into single-instrument track files
//! - `roll encode <MIDI>` - Encode a MIDI file as a JSON piano roll
//! - `roll decode <JSON> -o <MIDI>` - Write a JSON piano roll back to MIDI
//! - `roll smush [SONG]` - Merge each song's tracks into one file
//! - `roll roundtrip <MIDI> -o <MIDI>` - Encode then decode in one go
//! - `roll show-config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

#[derive(Parser)]
#[command(name = "roll")]
#[command(about = "Binary piano-roll encoding for MIDI datasets")]
#[command(version)]
struct Cli {
    /// Config file used in place of ./pianoroll.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root holding Songs/, Tracks/ and Smushed/
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split songs into single-instrument track files
    Split {
        /// Song name or path; every song in Songs/ when omitted
        song: Option<String>,
    },

    /// Encode a MIDI file as a JSON piano roll
    Encode {
        midi: PathBuf,

        /// Output JSON path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Encode every instrument part instead of only the first
        #[arg(long)]
        all_parts: bool,
    },

    /// Write a JSON piano roll back to MIDI
    Decode {
        json: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge Tracks/<SONG>/*.mid into Smushed/<SONG>.mid
    Smush {
        /// Song name; every song in Tracks/ when omitted
        song: Option<String>,
    },

    /// Encode a MIDI file and immediately decode it again
    Roundtrip {
        midi: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        all_parts: bool,
    },

    /// Print the effective configuration and where it came from
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = rollconf::RollConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(base_dir) = cli.base_dir {
        config.paths.base_dir = base_dir;
    }

    let filter = EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Split { song } => {
            commands::split(&config, song.as_deref())?;
        }
        Commands::Encode {
            midi,
            output,
            all_parts,
        } => {
            commands::encode(&config, &midi, output.as_deref(), all_parts)?;
        }
        Commands::Decode { json, output } => {
            commands::decode(&config, &json, &output)?;
        }
        Commands::Smush { song } => {
            commands::smush(&config, song.as_deref())?;
        }
        Commands::Roundtrip {
            midi,
            output,
            all_parts,
        } => {
            commands::roundtrip(&config, &midi, &output, all_parts)?;
        }
        Commands::ShowConfig => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}
