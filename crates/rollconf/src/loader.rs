//! Config file discovery, loading, and environment variable overlay.

use crate::curation::{CurationConfig, ExportConfig, FamilyRange};
use crate::infra::{PathsConfig, TelemetryConfig};
use crate::{ConfigError, RollConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/pianoroll/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("pianoroll/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("pianoroll.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<RollConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from a TOML string. Missing keys keep their defaults.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<RollConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let invalid = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut config = RollConfig::default();

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("base_dir").and_then(|v| v.as_str()) {
            config.paths.base_dir = expand_path(v);
        }
        if let Some(v) = paths.get("songs_dir").and_then(|v| v.as_str()) {
            config.paths.songs_dir = v.to_string();
        }
        if let Some(v) = paths.get("tracks_dir").and_then(|v| v.as_str()) {
            config.paths.tracks_dir = v.to_string();
        }
        if let Some(v) = paths.get("smushed_dir").and_then(|v| v.as_str()) {
            config.paths.smushed_dir = v.to_string();
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    if let Some(curation) = table.get("curation").and_then(|v| v.as_table()) {
        if let Some(families) = curation.get("families").and_then(|v| v.as_table()) {
            // A families table replaces the defaults wholesale
            config.curation.families.clear();
            for (name, range) in families {
                let range = parse_family_range(range)
                    .ok_or_else(|| invalid(format!("family {} must be [first, last] in 1..=128", name)))?;
                config.curation.families.insert(name.clone(), range);
            }
        }
        if let Some(allowed) = curation.get("allowed").and_then(|v| v.as_array()) {
            config.curation.allowed = allowed
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect();
        }
        if let Some(numerators) = curation.get("numerators").and_then(|v| v.as_array()) {
            config.curation.numerators = numerators
                .iter()
                .filter_map(|v| v.as_integer())
                .filter_map(|n| u8::try_from(n).ok())
                .collect();
        }
        if let Some(v) = curation.get("denominator").and_then(|v| v.as_integer()) {
            config.curation.denominator =
                u8::try_from(v).map_err(|_| invalid(format!("denominator {} out of range", v)))?;
        }
        if let Some(v) = curation.get("percussion_channel").and_then(|v| v.as_integer()) {
            config.curation.percussion_channel = u8::try_from(v)
                .ok()
                .filter(|ch| *ch < 16)
                .ok_or_else(|| invalid(format!("percussion_channel {} not in 0..16", v)))?;
        }
        if let Some(v) = curation.get("min_track_events").and_then(|v| v.as_integer()) {
            config.curation.min_track_events = v.max(0) as usize;
        }
    }

    if let Some(export) = table.get("export").and_then(|v| v.as_table()) {
        if let Some(v) = export.get("ticks_per_beat").and_then(|v| v.as_integer()) {
            config.export.ticks_per_beat = u16::try_from(v)
                .ok()
                .filter(|t| *t > 0 && *t < 0x8000)
                .ok_or_else(|| invalid(format!("ticks_per_beat {} not in 1..32768", v)))?;
        }
        if let Some(v) = export.get("velocity").and_then(|v| v.as_integer()) {
            config.export.velocity = v.clamp(1, 127) as u8;
        }
        if let Some(v) = export.get("tempo_bpm") {
            if let Some(bpm) = v.as_float().or_else(|| v.as_integer().map(|i| i as f64)) {
                config.export.tempo_bpm = bpm;
            }
        }
        if let Some(v) = export.get("program").and_then(|v| v.as_integer()) {
            config.export.program = Some(
                u8::try_from(v)
                    .ok()
                    .filter(|p| *p < 128)
                    .ok_or_else(|| invalid(format!("program {} not in 0..128", v)))?,
            );
        }
    }

    Ok(config)
}

/// `[first, last]` with 1 <= first <= last <= 128.
fn parse_family_range(value: &toml::Value) -> Option<FamilyRange> {
    let pair = value.as_array()?;
    let [first, last] = pair.as_slice() else {
        return None;
    };
    let first = u8::try_from(first.as_integer()?).ok()?;
    let last = u8::try_from(last.as_integer()?).ok()?;
    (1 <= first && first <= last && last <= 128).then_some(FamilyRange::new(first, last))
}

/// Pick `overlay` when it differs from the compiled default, else `base`.
fn layer<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge two configs field by field, with `overlay` taking precedence.
///
/// A field left at its default in `overlay` does not reset `base`.
pub fn merge_configs(base: RollConfig, overlay: RollConfig) -> RollConfig {
    let paths = PathsConfig::default();
    let telemetry = TelemetryConfig::default();
    let curation = CurationConfig::default();
    let export = ExportConfig::default();

    RollConfig {
        paths: PathsConfig {
            base_dir: layer(base.paths.base_dir, overlay.paths.base_dir, paths.base_dir),
            songs_dir: layer(base.paths.songs_dir, overlay.paths.songs_dir, paths.songs_dir),
            tracks_dir: layer(base.paths.tracks_dir, overlay.paths.tracks_dir, paths.tracks_dir),
            smushed_dir: layer(
                base.paths.smushed_dir,
                overlay.paths.smushed_dir,
                paths.smushed_dir,
            ),
        },
        telemetry: TelemetryConfig {
            log_level: layer(
                base.telemetry.log_level,
                overlay.telemetry.log_level,
                telemetry.log_level,
            ),
        },
        curation: CurationConfig {
            families: layer(
                base.curation.families,
                overlay.curation.families,
                curation.families,
            ),
            allowed: layer(base.curation.allowed, overlay.curation.allowed, curation.allowed),
            numerators: layer(
                base.curation.numerators,
                overlay.curation.numerators,
                curation.numerators,
            ),
            denominator: layer(
                base.curation.denominator,
                overlay.curation.denominator,
                curation.denominator,
            ),
            percussion_channel: layer(
                base.curation.percussion_channel,
                overlay.curation.percussion_channel,
                curation.percussion_channel,
            ),
            min_track_events: layer(
                base.curation.min_track_events,
                overlay.curation.min_track_events,
                curation.min_track_events,
            ),
        },
        export: ExportConfig {
            ticks_per_beat: layer(
                base.export.ticks_per_beat,
                overlay.export.ticks_per_beat,
                export.ticks_per_beat,
            ),
            velocity: layer(base.export.velocity, overlay.export.velocity, export.velocity),
            tempo_bpm: layer(base.export.tempo_bpm, overlay.export.tempo_bpm, export.tempo_bpm),
            program: overlay.export.program.or(base.export.program),
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut RollConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any variable lookup.
pub(crate) fn apply_overrides_from<F>(config: &mut RollConfig, sources: &mut ConfigSources, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = var("PIANOROLL_BASE_DIR") {
        config.paths.base_dir = expand_path(&v);
        sources.env_overrides.push("PIANOROLL_BASE_DIR".to_string());
    }

    if let Some(v) = var("PIANOROLL_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("PIANOROLL_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    // Comma separated, e.g. "Guitar,Bass"
    if let Some(v) = var("PIANOROLL_ALLOWED_FAMILIES") {
        config.curation.allowed = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        sources.env_overrides.push("PIANOROLL_ALLOWED_FAMILIES".to_string());
    }

    if let Some(v) = var("PIANOROLL_TICKS_PER_BEAT") {
        if let Ok(ticks) = v.parse::<u16>() {
            if ticks > 0 && ticks < 0x8000 {
                config.export.ticks_per_beat = ticks;
                sources.env_overrides.push("PIANOROLL_TICKS_PER_BEAT".to_string());
            }
        }
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/midi-files");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("midi-files"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/data/midi"), PathBuf::from("/data/midi"));
        assert_eq!(expand_path("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_expand_path_unset_var() {
        let raw = "$PIANOROLL_SURELY_UNSET_VAR/x";
        assert_eq!(expand_path(raw), PathBuf::from(raw));
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_cli_override_must_exist() {
        let files = discover_config_files_with_override(Some(Path::new("/nonexistent/roll.toml")));
        assert!(!files.contains(&PathBuf::from("/nonexistent/roll.toml")));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[paths]
base_dir = "/data/midi"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.paths.base_dir, PathBuf::from("/data/midi"));
        // Other values should be defaults
        assert_eq!(config.paths.songs_dir, "Songs");
        assert_eq!(config.curation, CurationConfig::default());
        assert_eq!(config.export.ticks_per_beat, 480);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[paths]
base_dir = "/data/midi"
tracks_dir = "Stems"

[telemetry]
log_level = "debug"

[curation]
allowed = ["Guitar", "Bass"]
numerators = [2, 4]
min_track_events = 20

[curation.families]
Guitar = [25, 32]
Bass = [33, 40]

[export]
ticks_per_beat = 960
velocity = 100
tempo_bpm = 96
program = 24
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.paths.tracks_dir, "Stems");
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.curation.families.len(), 2);
        assert_eq!(config.curation.families.get("Bass"), Some(&FamilyRange::new(33, 40)));
        assert_eq!(config.curation.allowed, vec!["Guitar".to_string(), "Bass".to_string()]);
        assert_eq!(config.curation.numerators, vec![2, 4]);
        assert_eq!(config.curation.min_track_events, 20);
        assert_eq!(config.export.ticks_per_beat, 960);
        assert_eq!(config.export.velocity, 100);
        assert_eq!(config.export.tempo_bpm, 96.0);
        assert_eq!(config.export.program, Some(24));
    }

    #[test]
    fn test_bad_family_range() {
        let toml = r#"
[curation.families]
Guitar = [32, 25]
"#;
        let err = parse_toml(toml, Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("Guitar"));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_bad_toml_syntax() {
        let err = parse_toml("[paths\nbase_dir = 1", Path::new("broken.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_keeps_base_for_default_fields() {
        let mut base = RollConfig::default();
        base.paths.base_dir = PathBuf::from("/system/midi");
        base.export.velocity = 70;

        let mut overlay = RollConfig::default();
        overlay.export.ticks_per_beat = 960;

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.paths.base_dir, PathBuf::from("/system/midi"));
        assert_eq!(merged.export.velocity, 70);
        assert_eq!(merged.export.ticks_per_beat, 960);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PIANOROLL_BASE_DIR", "/env/midi"),
            ("PIANOROLL_ALLOWED_FAMILIES", "Guitar, Strings,"),
            ("PIANOROLL_TICKS_PER_BEAT", "96"),
            ("RUST_LOG", "piano_roll=debug"),
        ]
        .into_iter()
        .collect();

        let mut config = RollConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.paths.base_dir, PathBuf::from("/env/midi"));
        assert_eq!(
            config.curation.allowed,
            vec!["Guitar".to_string(), "Strings".to_string()]
        );
        assert_eq!(config.export.ticks_per_beat, 96);
        assert_eq!(config.telemetry.log_level, "piano_roll=debug");
        assert_eq!(sources.env_overrides.len(), 4);
    }

    #[test]
    fn test_bad_env_value_ignored() {
        let mut config = RollConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |k| {
            (k == "PIANOROLL_TICKS_PER_BEAT").then(|| "lots".to_string())
        });
        assert_eq!(config.export.ticks_per_beat, 480);
        assert!(sources.env_overrides.is_empty());
    }
}
