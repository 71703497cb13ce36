//! Runtime settings stored as JSON next to the binary.
//!
//! A missing file is created with defaults; keys absent from an existing file
//! fall back to their defaults.

use crate::error::{AutoError, AutoResult};
use crate::game_automation::layout::Layout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// How the evolve step decides which follower slots to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDetection {
    /// Tap every slot and look for an evolve button
    #[default]
    FullScan,
    /// Only try slots whose colour differs from the empty board captured at match start
    ColorBaseline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub emulator_port: u16,
    /// Seconds between classifier ticks
    pub scan_interval: f64,
    /// Threshold applied to templates loaded from `extra_templates_dir`
    pub evolution_threshold: f32,
    pub extra_templates_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub shield_dir: PathBuf,
    pub stats_file: PathBuf,
    pub slot_detection: SlotDetection,
    pub layout: Layout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            emulator_port: 16384,
            scan_interval: 2.0,
            evolution_threshold: 0.85,
            extra_templates_dir: PathBuf::from("extra_templates"),
            templates_dir: PathBuf::from("templates"),
            shield_dir: PathBuf::from("shield"),
            stats_file: PathBuf::from("round_statistics.json"),
            slot_detection: SlotDetection::default(),
            layout: Layout::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`, writing the defaults there first if the file does not exist
    pub fn load_or_create(path: &Path) -> AutoResult<Self> {
        if !path.exists() {
            let settings = Settings::default();
            settings.save(path)?;
            log::info!("📝 Created default config at {}", path.display());
            return Ok(settings);
        }
        let text = std::fs::read_to_string(path).map_err(|source| AutoError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AutoError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> AutoResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(|source| AutoError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| AutoError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Tick interval; negative or non-finite values clamp to zero
    pub fn scan_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.scan_interval).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let settings = Settings::load_or_create(&path).unwrap();

        assert_eq!(settings, Settings::default());
        assert!(path.exists(), "Defaults should be written to disk");
        assert_eq!(settings.emulator_port, 16384);
        assert_eq!(settings.scan_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_missing_keys_are_filled_from_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"emulator_port": 5555, "slot_detection": "color_baseline"}"#)
            .unwrap();

        let settings = Settings::load_or_create(&path).unwrap();

        assert_eq!(settings.emulator_port, 5555);
        assert_eq!(settings.slot_detection, SlotDetection::ColorBaseline);
        assert_eq!(settings.evolution_threshold, 0.85);
        assert_eq!(settings.extra_templates_dir, PathBuf::from("extra_templates"));
        assert_eq!(settings.layout, Layout::default());
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Settings::load_or_create(&path).unwrap_err();
        assert!(matches!(err, AutoError::ConfigParse { .. }));
    }

    #[test]
    fn test_negative_interval_clamps_to_zero() {
        let settings = Settings {
            scan_interval: -1.0,
            ..Settings::default()
        };
        assert_eq!(settings.scan_interval(), Duration::ZERO);
    }
}
