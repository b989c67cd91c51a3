//! Configuration loading for the piano-roll tools.
//!
//! Everything has a compiled default, so no config file is required.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rollconf::RollConfig;
//!
//! let config = RollConfig::load().expect("Failed to load config");
//!
//! println!("Songs: {}", config.paths.songs().display());
//! for family in &config.curation.allowed {
//!     println!("Keeping {} tracks", family);
//! }
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/pianoroll/config.toml` (system)
//! 2. `~/.config/pianoroll/config.toml` (user)
//! 3. `./pianoroll.toml` (local override), or the `--config` path
//! 4. Environment variables (`PIANOROLL_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! base_dir = "~/midi-files"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [curation]
//! allowed = ["Guitar", "Bass"]
//!
//! [curation.families]
//! Guitar = [25, 32]
//! Bass = [33, 40]
//!
//! [export]
//! ticks_per_beat = 480
//! velocity = 90
//! ```

pub mod curation;
pub mod infra;
pub mod loader;

pub use curation::{CurationConfig, ExportConfig, FamilyRange};
pub use infra::{PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RollConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub curation: CurationConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl RollConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/pianoroll/config.toml`
    /// 3. `~/.config/pianoroll/config.toml`
    /// 4. `./pianoroll.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` standing in for the local
    /// `./pianoroll.toml`. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = RollConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Built by hand so families render as [first, last]
        let mut output = String::new();

        output.push_str("# Piano Roll Configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "base_dir = \"{}\"\n",
            self.paths.base_dir.display()
        ));
        output.push_str(&format!("songs_dir = \"{}\"\n", self.paths.songs_dir));
        output.push_str(&format!("tracks_dir = \"{}\"\n", self.paths.tracks_dir));
        output.push_str(&format!("smushed_dir = \"{}\"\n", self.paths.smushed_dir));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output.push_str("\n[curation]\n");
        let allowed: Vec<String> = self
            .curation
            .allowed
            .iter()
            .map(|name| format!("\"{}\"", name))
            .collect();
        output.push_str(&format!("allowed = [{}]\n", allowed.join(", ")));
        let numerators: Vec<String> = self
            .curation
            .numerators
            .iter()
            .map(|n| n.to_string())
            .collect();
        output.push_str(&format!("numerators = [{}]\n", numerators.join(", ")));
        output.push_str(&format!("denominator = {}\n", self.curation.denominator));
        output.push_str(&format!(
            "percussion_channel = {}\n",
            self.curation.percussion_channel
        ));
        output.push_str(&format!(
            "min_track_events = {}\n",
            self.curation.min_track_events
        ));

        output.push_str("\n[curation.families]\n");
        for (name, range) in &self.curation.families {
            output.push_str(&format!(
                "\"{}\" = [{}, {}]\n",
                name, range.first, range.last
            ));
        }

        output.push_str("\n[export]\n");
        output.push_str(&format!(
            "ticks_per_beat = {}\n",
            self.export.ticks_per_beat
        ));
        output.push_str(&format!("velocity = {}\n", self.export.velocity));
        output.push_str(&format!("tempo_bpm = {:?}\n", self.export.tempo_bpm));
        if let Some(program) = self.export.program {
            output.push_str(&format!("program = {}\n", program));
        }

        output
    }
}
