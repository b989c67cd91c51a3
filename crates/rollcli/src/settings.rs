//! Config values to library types.

use piano_roll::{CurationRules, DurationCodec, ExportOptions, Pipeline, RollGeometry};
use rollconf::RollConfig;

pub fn curation_rules(config: &RollConfig) -> CurationRules {
    CurationRules::from(&config.curation)
}

pub fn pipeline(config: &RollConfig) -> piano_roll::Result<Pipeline> {
    Pipeline::new(
        RollGeometry::default(),
        DurationCodec::default(),
        ExportOptions::from(&config.export),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rollconf::FamilyRange;

    #[test]
    fn default_config_matches_library_defaults() {
        let config = RollConfig::default();
        assert_eq!(curation_rules(&config), CurationRules::default());

        let pipeline = pipeline(&config).unwrap();
        assert_eq!(pipeline.export().ticks_per_beat, 480);
        assert_eq!(pipeline.export().velocity, 90);
        assert_eq!(pipeline.export().program, None);
    }

    #[test]
    fn custom_families_carry_over() {
        let mut config = RollConfig::default();
        config
            .curation
            .families
            .insert("Synth Lead".to_string(), FamilyRange::new(81, 88));
        config.curation.allowed = vec!["Synth Lead".to_string()];

        let rules = curation_rules(&config);
        assert!(rules.allows_program(80));
        assert!(!rules.allows_program(24));
    }

    #[test]
    fn pipeline_uses_export_settings() {
        let mut config = RollConfig::default();
        config.export.ticks_per_beat = 96;
        let pipeline = pipeline(&config).unwrap();
        assert_eq!(pipeline.export().ticks_per_beat, 96);
        assert_eq!(pipeline.encoder().geometry(), &RollGeometry::default());
    }
}
