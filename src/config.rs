use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "OVERLAY";
const DEFAULT_CONFIG_FILE: &str = "overlay";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub overlay: OverlayConfig,
    pub capture: CaptureConfig,
    pub scheduler: SchedulerConfig,
    pub models: ModelPaths,
    pub log_level: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            overlay: OverlayConfig::default(),
            capture: CaptureConfig::default(),
            scheduler: SchedulerConfig::default(),
            models: ModelPaths::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Capability toggles and visual parameters for the compositor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub show_face_landmarks: bool,
    pub show_hand_landmarks: bool,
    pub show_object_detections: bool,
    pub segmentation_enabled: bool,
    pub segmentation_threshold: f32,
    pub score_threshold: f32,
    /// RGBA, 0-255 per channel.
    pub virtual_background_color: [u8; 4],
    pub virtual_background_transparency: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            show_face_landmarks: false,
            show_hand_landmarks: true,
            show_object_detections: false,
            segmentation_enabled: false,
            segmentation_threshold: 0.7,
            score_threshold: 0.5,
            virtual_background_color: [0, 0, 0, 255],
            virtual_background_transparency: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on a single adapter call. Zero disables the bound.
    pub detector_timeout_ms: u64,
    /// Pause before polling again when the source has no new frame.
    pub idle_backoff_ms: u64,
    /// Pause between rendered cycles. Zero yields without sleeping.
    pub frame_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            detector_timeout_ms: 250,
            idle_backoff_ms: 5,
            frame_interval_ms: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn detector_timeout(&self) -> Option<Duration> {
        (self.detector_timeout_ms > 0).then(|| Duration::from_millis(self.detector_timeout_ms))
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Model asset locations, handed to adapters untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub object_detection: Option<String>,
    pub face_landmarks: Option<String>,
    pub gesture_recognition: Option<String>,
    pub person_segmentation: Option<String>,
}

impl Configuration {
    /// Loads `overlay.{toml,yaml,json}` from the working directory if present,
    /// then applies `OVERLAY__*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE, false)
    }

    /// Loads a specific configuration file, which must exist.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        Self::load_from(&path, true)
    }

    fn load_from(name: &str, required: bool) -> Result<Self, ConfigError> {
        let configuration: Configuration = config::Config::builder()
            .add_source(config::File::with_name(name).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_ranges = [
            ("segmentation_threshold", self.overlay.segmentation_threshold),
            ("score_threshold", self.overlay.score_threshold),
            (
                "virtual_background_transparency",
                self.overlay.virtual_background_transparency,
            ),
        ];
        for (name, value) in unit_ranges {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::Invalid(
                "Capture width and height must be greater than 0".to_string(),
            ));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "Unknown log level '{}'",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn with_overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_capture_size(mut self, width: u32, height: u32) -> Self {
        self.capture = CaptureConfig { width, height };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_settings() {
        let configuration = Configuration::default();
        assert!(configuration.overlay.show_hand_landmarks);
        assert!(!configuration.overlay.show_face_landmarks);
        assert!(!configuration.overlay.segmentation_enabled);
        assert_eq!(configuration.overlay.segmentation_threshold, 0.7);
        assert_eq!(configuration.overlay.score_threshold, 0.5);
        assert_eq!(configuration.capture, CaptureConfig { width: 1280, height: 720 });
        assert!(configuration.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut configuration = Configuration::default();
        configuration.overlay.score_threshold = 1.5;
        assert!(matches!(
            configuration.validate(),
            Err(ConfigError::Invalid(message)) if message.contains("score_threshold")
        ));
    }

    #[test]
    fn validate_rejects_zero_capture_size() {
        let configuration = Configuration::default().with_capture_size(0, 720);
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn zero_timeout_disables_bound() {
        let scheduler = SchedulerConfig {
            detector_timeout_ms: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(scheduler.detector_timeout(), None);
        assert_eq!(
            SchedulerConfig::default().detector_timeout(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn load_file_merges_partial_settings_with_defaults() {
        let path = std::env::temp_dir().join(format!(
            "overlay-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[overlay]\nshow_face_landmarks = true\nscore_threshold = 0.25\n\n[scheduler]\ndetector_timeout_ms = 40"
        )
        .unwrap();

        let configuration = Configuration::load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(configuration.overlay.show_face_landmarks);
        assert_eq!(configuration.overlay.score_threshold, 0.25);
        assert!(configuration.overlay.show_hand_landmarks);
        assert_eq!(configuration.scheduler.detector_timeout_ms, 40);
        assert_eq!(configuration.capture.width, 1280);
    }

    #[test]
    fn load_file_fails_for_missing_file() {
        let result = Configuration::load_file("/nonexistent/overlay-settings.toml");
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
