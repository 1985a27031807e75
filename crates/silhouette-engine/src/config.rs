use std::path::Path;

use serde::{Deserialize, Serialize};
use silhouette_core::ConfidenceThresholds;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Detection/tracking confidence preset forwarded to the perception service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl DetectionPreset {
    pub fn confidence(&self) -> f32 {
        match self {
            DetectionPreset::Low => 0.3,
            DetectionPreset::Medium => 0.5,
            DetectionPreset::High => 0.7,
        }
    }
}

/// Pose model size forwarded to the perception service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelComplexity {
    Lite,
    #[default]
    Full,
    Heavy,
}

impl ModelComplexity {
    pub fn level(&self) -> u8 {
        match self {
            ModelComplexity::Lite => 0,
            ModelComplexity::Full => 1,
            ModelComplexity::Heavy => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    pub detection_confidence: DetectionPreset,
    pub model_complexity: ModelComplexity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Frames retained in the rolling window.
    pub buffer_size: usize,
    /// Frames required before an average is produced.
    pub min_frames: usize,
    /// Samples at or below this visibility are dropped from the average.
    pub visibility_gate: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10,
            min_frames: 3,
            visibility_gate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Only every n-th frame is classified.
    pub frame_stride: u32,
    /// Mean raw landmark visibility required before classifying.
    pub min_mean_visibility: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            frame_stride: 5,
            min_mean_visibility: 0.65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    /// Side of the square window averaged by the region strategy, in pixels.
    pub region_size: u32,
    pub brightness_min: f32,
    pub brightness_max: f32,
    pub apply_skin_mask: bool,
    pub enhance_contrast: bool,
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            region_size: 50,
            brightness_min: 30.0,
            brightness_max: 250.0,
            apply_skin_mask: false,
            enhance_contrast: false,
            clahe_tiles: 8,
            clahe_clip_limit: 0.02,
        }
    }
}

/// Engine configuration: defaults, then an optional TOML file, then
/// `SILHOUETTE_*` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub perception: PerceptionConfig,
    pub smoothing: SmoothingConfig,
    pub body: BodyConfig,
    pub confidence: ConfidenceThresholds,
    pub skin: SkinConfig,
}

impl EngineConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then overlay environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env();
        config.validate()?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `SILHOUETTE_*` overrides from `lookup`. Unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let smoothing = &mut self.smoothing;
        override_with(&lookup, "SILHOUETTE_BUFFER_SIZE", &mut smoothing.buffer_size);
        override_with(&lookup, "SILHOUETTE_VISIBILITY_GATE", &mut smoothing.visibility_gate);
        override_with(&lookup, "SILHOUETTE_FRAME_STRIDE", &mut self.body.frame_stride);
        override_with(&lookup, "SILHOUETTE_MIN_VISIBILITY", &mut self.body.min_mean_visibility);
        override_with(&lookup, "SILHOUETTE_ACCEPT_THRESHOLD", &mut self.confidence.accept);
        override_with(&lookup, "SILHOUETTE_FLAG_THRESHOLD", &mut self.confidence.flag);
        override_with(&lookup, "SILHOUETTE_REGION_SIZE", &mut self.skin.region_size);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.smoothing;
        if s.min_frames == 0 {
            return Err(ConfigError::Invalid("smoothing.min_frames must be at least 1".into()));
        }
        if s.buffer_size < s.min_frames {
            return Err(ConfigError::Invalid(format!(
                "smoothing.buffer_size ({}) is smaller than min_frames ({})",
                s.buffer_size, s.min_frames
            )));
        }
        if self.body.frame_stride == 0 {
            return Err(ConfigError::Invalid("body.frame_stride must be at least 1".into()));
        }
        for (name, v) in [
            ("smoothing.visibility_gate", s.visibility_gate),
            ("body.min_mean_visibility", self.body.min_mean_visibility),
            ("confidence.accept", self.confidence.accept),
            ("confidence.flag", self.confidence.flag),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {v}")));
            }
        }
        if self.confidence.flag > self.confidence.accept {
            return Err(ConfigError::Invalid(format!(
                "confidence.flag ({}) exceeds confidence.accept ({})",
                self.confidence.flag, self.confidence.accept
            )));
        }
        if self.skin.region_size == 0 {
            return Err(ConfigError::Invalid("skin.region_size must be at least 1".into()));
        }
        if self.skin.brightness_min >= self.skin.brightness_max {
            return Err(ConfigError::Invalid(
                "skin.brightness_min must be below skin.brightness_max".into(),
            ));
        }
        Ok(())
    }
}

fn override_with<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(v) = lookup(key).and_then(|v| v.trim().parse().ok()) {
        *slot = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.smoothing.buffer_size, 10);
        assert_eq!(c.smoothing.min_frames, 3);
        assert_eq!(c.body.frame_stride, 5);
        assert!((c.smoothing.visibility_gate - 0.2).abs() < 1e-6);
        assert!((c.body.min_mean_visibility - 0.65).abs() < 1e-6);
        assert!((c.confidence.accept - 0.6).abs() < 1e-6);
        assert!((c.confidence.flag - 0.4).abs() < 1e-6);
        assert_eq!(c.perception.detection_confidence.confidence(), 0.5);
        assert_eq!(c.perception.model_complexity.level(), 1);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = EngineConfig::from_toml_str(
            r#"
            [perception]
            detection_confidence = "high"
            model_complexity = "heavy"

            [body]
            frame_stride = 3
            "#,
        )
        .unwrap();
        assert_eq!(c.body.frame_stride, 3);
        assert!((c.body.min_mean_visibility - 0.65).abs() < 1e-6);
        assert_eq!(c.perception.detection_confidence, DetectionPreset::High);
        assert_eq!(c.perception.model_complexity.level(), 2);
        assert_eq!(c.smoothing.buffer_size, 10);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = EngineConfig::from_toml_str("[body]\nframe_stride = \"five\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let err = EngineConfig::from_toml_str("[confidence]\naccept = 0.3\nflag = 0.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_validation_rejects_small_buffer() {
        let mut c = EngineConfig::default();
        c.smoothing.buffer_size = 2;
        assert!(c.validate().is_err());
        c.smoothing.buffer_size = 10;
        c.body.frame_stride = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SILHOUETTE_BUFFER_SIZE", "12"),
            ("SILHOUETTE_FRAME_STRIDE", " 2 "),
            ("SILHOUETTE_ACCEPT_THRESHOLD", "0.7"),
            ("SILHOUETTE_REGION_SIZE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut c = EngineConfig::default();
        c.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.smoothing.buffer_size, 12);
        assert_eq!(c.body.frame_stride, 2);
        assert!((c.confidence.accept - 0.7).abs() < 1e-6);
        assert_eq!(c.skin.region_size, 50, "unparsable override must be ignored");
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/silhouette.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let text = toml::to_string(&EngineConfig::default()).unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), EngineConfig::default());
    }
}
