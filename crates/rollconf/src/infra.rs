//! Where data lives and how loudly to log.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dataset directory layout.
///
/// Subdirectory names are relative to `base_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the dataset.
    /// Default: ./midi-files
    #[serde(default = "PathsConfig::default_base_dir")]
    pub base_dir: PathBuf,

    /// Multi-track input songs.
    /// Default: Songs
    #[serde(default = "PathsConfig::default_songs_dir")]
    pub songs_dir: String,

    /// One subdirectory of single-track files per song.
    /// Default: Tracks
    #[serde(default = "PathsConfig::default_tracks_dir")]
    pub tracks_dir: String,

    /// Merged songs.
    /// Default: Smushed
    #[serde(default = "PathsConfig::default_smushed_dir")]
    pub smushed_dir: String,
}

impl PathsConfig {
    fn default_base_dir() -> PathBuf {
        PathBuf::from("midi-files")
    }

    fn default_songs_dir() -> String {
        "Songs".to_string()
    }

    fn default_tracks_dir() -> String {
        "Tracks".to_string()
    }

    fn default_smushed_dir() -> String {
        "Smushed".to_string()
    }

    pub fn songs(&self) -> PathBuf {
        self.base_dir.join(&self.songs_dir)
    }

    pub fn tracks(&self) -> PathBuf {
        self.base_dir.join(&self.tracks_dir)
    }

    /// `Tracks/<song>`.
    pub fn song_tracks(&self, song: &str) -> PathBuf {
        self.tracks().join(song)
    }

    pub fn smushed(&self) -> PathBuf {
        self.base_dir.join(&self.smushed_dir)
    }

    /// `Smushed/<song>.mid`.
    pub fn smushed_song(&self, song: &str) -> PathBuf {
        self.smushed().join(format!("{}.mid", song))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: Self::default_base_dir(),
            songs_dir: Self::default_songs_dir(),
            tracks_dir: Self::default_tracks_dir(),
            smushed_dir: Self::default_smushed_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
