use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_model() -> String {
    "yolov8m.onnx".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.4
}

fn default_nms_iou() -> f32 {
    0.5
}

fn default_vehicle_classes() -> Vec<usize> {
    // COCO car, motorcycle, bus, truck
    vec![2, 3, 5, 7]
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_nms_iou")]
    pub nms_iou: f32,
    #[serde(default = "default_vehicle_classes")]
    pub vehicle_classes: Vec<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            confidence_threshold: default_confidence_threshold(),
            nms_iou: default_nms_iou(),
            vehicle_classes: default_vehicle_classes(),
        }
    }
}

fn default_max_age() -> u32 {
    30
}

fn default_min_hits() -> u32 {
    3
}

fn default_iou_threshold() -> f64 {
    0.3
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    #[serde(default = "default_min_hits")]
    pub min_hits: u32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            min_hits: default_min_hits(),
            iou_threshold: default_iou_threshold(),
        }
    }
}

fn default_offset() -> i32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountingConfig {
    /// Pixel row of the counting line; unset means half the frame height.
    #[serde(default)]
    pub line_position: Option<i32>,
    #[serde(default = "default_offset")]
    pub offset: i32,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            line_position: None,
            offset: default_offset(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub counting: CountingConfig,
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to the
    /// built-in defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        if !Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Ok(Config::default());
        }
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.detector.model, "yolov8m.onnx");
        assert_eq!(config.detector.confidence_threshold, 0.4);
        assert_eq!(config.detector.vehicle_classes, vec![2, 3, 5, 7]);
        assert_eq!(config.tracker.max_age, 30);
        assert_eq!(config.tracker.min_hits, 3);
        assert_eq!(config.counting.line_position, None);
        assert_eq!(config.counting.offset, 10);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [counting]
            line_position = 300

            [tracker]
            max_age = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.counting.line_position, Some(300));
        assert_eq!(config.counting.offset, 10);
        assert_eq!(config.tracker.max_age, 15);
        assert_eq!(config.detector.confidence_threshold, 0.4);
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[counting]\nline_position = \"middle\"");

        assert!(result.is_err());
    }
}
