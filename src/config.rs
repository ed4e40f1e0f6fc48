use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::{ColorModel, ColorSpace};
use crate::detection::evaluator::EvaluatorConfig;
use crate::detection::region::BoundingBox;
use crate::detection::tracker::TrackerConfig;
use crate::error::{ConfigError, SentinelError};

/// Application directory name under the platform config dir
pub const APP_DIR_NAME: &str = "ColorSentinel";

const CONFIG_FILE_NAME: &str = "sentinel.json";

fn default_denoise() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Color membership test applied to every pixel
    pub color_model: ColorModel,

    /// Components smaller than this are dropped as noise
    pub min_region_pixels: usize,

    /// Maximum centroid distance (pixels) for a region to continue a track
    pub max_track_distance: f64,

    /// Maximum size-ratio deviation (0 = same size) for a match
    pub max_size_ratio_deviation: f64,

    /// Consecutive missed frames a track survives
    pub max_misses: u32,

    /// Minimum region pixel count for an event
    pub min_area: usize,

    /// Minimum track age (frames) for an event
    pub min_persistence_frames: u32,

    /// Minimum age gap (frames) between two events of one track
    pub debounce_frames: u32,

    /// Clear isolated mask pixels before extraction
    #[serde(default = "default_denoise")]
    pub denoise: bool,

    /// Only pixels inside this rectangle are segmented
    #[serde(default)]
    pub roi: Option<BoundingBox>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            // saturated red, wrapping around hue 0
            color_model: ColorModel::Distance {
                space: ColorSpace::Hsv,
                reference: [0.0, 80.0, 80.0],
                tolerance: 30.0,
            },
            min_region_pixels: 25,
            max_track_distance: 40.0,
            max_size_ratio_deviation: 0.5,
            max_misses: 5,
            min_area: 100,
            min_persistence_frames: 10,
            debounce_frames: 150, // ~5 seconds at 30 fps
            denoise: true,
            roi: None,
        }
    }
}

impl SentinelConfig {
    /// Reject contradictory or out-of-range settings. Nothing is clamped.
    pub fn validate(&self) -> Result<(), SentinelError> {
        self.color_model.validate()?;
        if self.min_region_pixels < 1 {
            return Err(SentinelError::configuration(
                "min_region_pixels must be at least 1",
            ));
        }
        if let Some(roi) = self.roi {
            if roi.is_empty() {
                return Err(SentinelError::configuration(format!(
                    "region of interest must be non-empty, got {}x{}",
                    roi.width, roi.height
                )));
            }
        }
        self.tracker_config().validate()?;
        self.evaluator_config().validate()?;
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            max_distance: self.max_track_distance,
            max_size_ratio_deviation: self.max_size_ratio_deviation,
            max_misses: self.max_misses,
        }
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            min_area: self.min_area,
            min_persistence_frames: self.min_persistence_frames,
            debounce_frames: self.debounce_frames,
        }
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: shown.clone(),
            source: Box::new(e),
        })?;
        let config: SentinelConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: shown.clone(),
                source: Box::new(e),
            })?;
        config.validate().map_err(|e| ConfigError::Invalid {
            path: shown.clone(),
            source: e,
        })?;

        tracing::info!("Loaded config from: {}", shown);
        Ok(config)
    }

    /// Save configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    /// Load `path`, writing the default configuration there first if the
    /// file does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }

        let config = SentinelConfig::default();
        config.save(path)?;
        tracing::info!("Created default config at: {}", path.display());
        Ok(config)
    }

    /// Platform config file location, e.g. `~/.config/ColorSentinel/sentinel.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("color-sentinel-{}-{}", name, nanos))
    }

    #[test]
    fn test_default_config() {
        let config = SentinelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_region_pixels, 25);
        assert_eq!(config.min_persistence_frames, 10);
        assert!(config.denoise);
        assert!(config.roi.is_none());
    }

    #[test]
    fn test_default_matches_red() {
        let config = SentinelConfig::default();
        assert!(config.color_model.matches(&image::Rgb([220, 30, 30])));
        assert!(config.color_model.matches(&image::Rgb([220, 30, 45])));
        assert!(!config.color_model.matches(&image::Rgb([30, 200, 30])));
        assert!(!config.color_model.matches(&image::Rgb([128, 128, 128])));
    }

    #[test]
    fn test_config_serialization() {
        let mut config = SentinelConfig::default();
        config.roi = Some(BoundingBox::new(10, 20, 300, 200));
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SentinelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = SentinelConfig::default();
        config.min_persistence_frames = 0;
        assert!(config.validate().unwrap_err().is_configuration());

        let mut config = SentinelConfig::default();
        config.max_track_distance = -1.0;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.min_region_pixels = 0;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.roi = Some(BoundingBox::new(0, 0, 10, 0));
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.color_model = ColorModel::Range {
            space: ColorSpace::Rgb,
            lower: [10.0, 0.0, 0.0],
            upper: [5.0, 255.0, 255.0],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_create_then_load() {
        let dir = temp_dir("config");
        let path = dir.join("nested").join("sentinel.json");

        let created = SentinelConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = SentinelConfig::load(&path).unwrap();
        assert_eq!(created, loaded);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = temp_dir("invalid");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sentinel.json");

        let mut config = SentinelConfig::default();
        config.min_persistence_frames = 0;
        config.save(&path).unwrap();
        assert!(matches!(
            SentinelConfig::load(&path),
            Err(ConfigError::Invalid { .. })
        ));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SentinelConfig::load(&path),
            Err(ConfigError::LoadFailed { .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_denoise_defaults_when_missing() {
        let json = r#"{
            "color_model": {"kind": "range", "space": "rgb", "lower": [200, 0, 0], "upper": [255, 60, 60]},
            "min_region_pixels": 5,
            "max_track_distance": 10.0,
            "max_size_ratio_deviation": 0.3,
            "max_misses": 2,
            "min_area": 9,
            "min_persistence_frames": 3,
            "debounce_frames": 5
        }"#;
        let config: SentinelConfig = serde_json::from_str(json).unwrap();
        assert!(config.denoise);
        assert!(config.roi.is_none());
        assert!(config.validate().is_ok());
    }
}
