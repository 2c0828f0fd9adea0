//! Configuration management for detection thresholds
//!
//! This module provides runtime configuration loading from JSON files,
//! so the detector can be re-tuned for a new microphone or recording
//! setup without recompilation. All durations are in seconds, amplitudes
//! in raw sample units.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
}

/// Impulse detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Averaged amplitude below which a maximum is ignored outright.
    /// Depends on the sound system; 1000-2000 is typical for 16-bit PCM.
    pub global_loud_amplitude: Option<f64>,
    /// Percentile of the averaged envelope taken as the typical signal level
    pub typical_signal_percentile: f64,
    /// Usual averaging aperture
    pub averaging_aperture: f64,
    /// Narrow averaging aperture used to resolve impulse shape
    pub averaging_impulse_aperture: f64,
    /// A good maximum must dominate this aperture
    pub local_max_aperture: f64,
    /// Required ratio of a good maximum to the typical signal
    pub min_ratio_to_typical_signal: f64,
    /// Context aperture for the low signal comparison
    pub local_max_wide_aperture: f64,
    /// Percentile of the context window taken as the low signal level
    pub local_max_low_signal_percentile: f64,
    /// Required ratio of a good maximum to the low signal
    pub min_ratio_to_low_signal: f64,
    /// Longest accepted impulse
    pub max_impulse_duration: f64,
    /// Silence required on each side of an impulse
    pub min_silence_near_impulse_duration: f64,
    /// Ratio between impulse level and the silence threshold
    pub ratio_of_impulse_and_silence: f64,
    /// Largest gap between two good maxima of the same series
    pub max_duration_between_sequential_good_maximums: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            global_loud_amplitude: None,
            // 0.5 means median: a cry must be clearly stronger than the usual signal
            typical_signal_percentile: 0.5,
            averaging_aperture: 0.2,
            averaging_impulse_aperture: 0.05,
            local_max_aperture: 0.25,
            min_ratio_to_typical_signal: 2.0,
            local_max_wide_aperture: 2.0,
            local_max_low_signal_percentile: 0.1,
            min_ratio_to_low_signal: 2.0,
            max_impulse_duration: 0.3,
            min_silence_near_impulse_duration: 0.5,
            ratio_of_impulse_and_silence: 2.0,
            max_duration_between_sequential_good_maximums: 2.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults if the file is missing or
    /// its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from JSON file, surfacing read and parse errors
    pub fn load_from_file_strict<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let contents = fs::read_to_string(&path)?;
        let config = serde_json::from_str(&contents)?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.global_loud_amplitude, None);
        assert_eq!(config.detection.typical_signal_percentile, 0.5);
        assert_eq!(config.detection.averaging_aperture, 0.2);
        assert_eq!(config.detection.averaging_impulse_aperture, 0.05);
        assert_eq!(config.detection.max_impulse_duration, 0.3);
        assert_eq!(
            config.detection.max_duration_between_sequential_good_maximums,
            2.0
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = AppConfig::default();
        config.detection.global_loud_amplitude = Some(1500.0);
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"detection": {"max_impulse_duration": 0.1}}"#).unwrap();
        assert_eq!(parsed.detection.max_impulse_duration, 0.1);
        assert_eq!(parsed.detection.averaging_aperture, 0.2);

        let empty: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AppConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/impulse_config.json");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_strict_load_reports_missing_file() {
        assert!(AppConfig::load_from_file_strict("/nonexistent/impulse_config.json").is_err());
    }
}
