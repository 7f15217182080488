//! Configuration and settings management for PenArm
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML files; the default location is `<config dir>/penarm/config.toml`.
//!
//! Configuration is organized into logical sections:
//! - Pipeline settings (joining, smoothing, drawing style)
//! - Motion settings (feedrates, pen lift, command budget)
//! - Connection settings (port, timeouts, retries)
//!
//! Out-of-range values are rejected, never clamped.

use crate::error::{SettingsError, SettingsResult};
use penarm_camtools::{DrawingStyle, GeneratorConfig, JoinConfig, MIN_FILL_SPACING};
use penarm_core::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform config directory.
pub const APP_DIR: &str = "penarm";

/// Stroke preparation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Largest endpoint gap bridged when joining fragments, mm
    pub join_threshold: f64,
    /// Smoothing spread in points; 0 disables smoothing
    pub smoothing_sigma: f64,
    /// How strokes are rendered
    pub style: DrawingStyle,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let join = JoinConfig::default();
        Self {
            join_threshold: join.join_threshold,
            smoothing_sigma: join.smoothing_sigma,
            style: DrawingStyle::Outline,
        }
    }
}

/// Motion program settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Travel feedrate, mm/min
    pub pen_up_feedrate: f64,
    /// Drawing feedrate, mm/min
    pub pen_down_feedrate: f64,
    /// Pen-up height above the drawing surface, mm
    pub pen_lift_height: f64,
    /// Largest number of commands per job
    pub max_commands: usize,
    /// First simplification tolerance when over budget, mm
    pub simplify_start: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        Self {
            pen_up_feedrate: generator.pen_up_feedrate,
            pen_down_feedrate: generator.pen_down_feedrate,
            pen_lift_height: 16.0,
            max_commands: generator.max_commands,
            simplify_start: generator.simplify_start,
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Last used serial port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Acknowledgment timeout per command, ms
    pub command_timeout_ms: u64,
    /// Acknowledgment timeout for homing, ms
    pub home_timeout_ms: u64,
    /// Resends after a timeout
    pub max_retries: u32,
    /// First retry delay, ms; doubles per retry
    pub retry_backoff_ms: u64,
    /// Minimum spacing of progress events, ms; 0 reports every command
    pub progress_interval_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115200,
            command_timeout_ms: 5000,
            home_timeout_ms: 60000,
            max_retries: 3,
            retry_backoff_ms: 200,
            progress_interval_ms: 0,
        }
    }
}

impl ConnectionSettings {
    /// Per-command timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Homing timeout.
    pub fn home_timeout(&self) -> Duration {
        Duration::from_millis(self.home_timeout_ms)
    }

    /// First retry delay.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Progress throttle, `None` when every command is reported.
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_ms > 0).then(|| Duration::from_millis(self.progress_interval_ms))
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Stroke preparation
    pub pipeline: PipelineSettings,
    /// Motion programs
    pub motion: MotionSettings,
    /// Arm link
    pub connection: ConnectionSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn invalid(key: &str, reason: String) -> ValidationError {
    ValidationError::InvalidConfig {
        key: key.to_string(),
        reason,
    }
}

fn check_range(key: &str, value: f64, min: f64, max: f64, min_inclusive: bool) -> Result<(), ValidationError> {
    let above_min = if min_inclusive { value >= min } else { value > min };
    if value.is_finite() && above_min && value <= max {
        Ok(())
    } else {
        let open = if min_inclusive { '[' } else { '(' };
        Err(invalid(key, format!("{} is outside {}{}, {}]", value, open, min, max)))
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load a file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::SaveError(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let p = &self.pipeline;
        check_range("pipeline.join_threshold", p.join_threshold, 0.0, 1000.0, true)?;
        check_range("pipeline.smoothing_sigma", p.smoothing_sigma, 0.0, 50.0, true)?;
        if let DrawingStyle::ZigzagFill { spacing, max_area } = p.style {
            check_range("pipeline.style.spacing", spacing, MIN_FILL_SPACING, 100.0, true)?;
            check_range("pipeline.style.max_area", max_area, 0.0, f64::MAX, true)?;
        }

        let m = &self.motion;
        check_range("motion.pen_up_feedrate", m.pen_up_feedrate, 0.0, 20000.0, false)?;
        check_range("motion.pen_down_feedrate", m.pen_down_feedrate, 0.0, 20000.0, false)?;
        check_range("motion.pen_lift_height", m.pen_lift_height, 0.0, 100.0, false)?;
        check_range("motion.simplify_start", m.simplify_start, 0.0, 100.0, false)?;
        if !(1..=1_000_000).contains(&m.max_commands) {
            return Err(invalid(
                "motion.max_commands",
                format!("{} is outside [1, 1000000]", m.max_commands),
            ));
        }

        let c = &self.connection;
        if c.baud_rate == 0 {
            return Err(invalid("connection.baud_rate", "must be > 0".to_string()));
        }
        if c.command_timeout_ms == 0 {
            return Err(invalid("connection.command_timeout_ms", "must be > 0".to_string()));
        }
        if c.home_timeout_ms == 0 {
            return Err(invalid("connection.home_timeout_ms", "must be > 0".to_string()));
        }
        if c.max_retries > 10 {
            return Err(invalid(
                "connection.max_retries",
                format!("{} is above 10", c.max_retries),
            ));
        }
        Ok(())
    }

    /// Joiner settings.
    pub fn join_config(&self) -> JoinConfig {
        JoinConfig {
            join_threshold: self.pipeline.join_threshold,
            smoothing_sigma: self.pipeline.smoothing_sigma,
        }
    }

    /// Generator settings for the calibrated pen heights.
    pub fn generator_config(&self, z_draw: f64, z_up: f64) -> GeneratorConfig {
        GeneratorConfig {
            pen_up_feedrate: self.motion.pen_up_feedrate,
            pen_down_feedrate: self.motion.pen_down_feedrate,
            z_up,
            z_draw,
            max_commands: self.motion.max_commands,
            style: self.pipeline.style,
            simplify_start: self.motion.simplify_start,
            ..GeneratorConfig::default()
        }
    }
}

/// The platform configuration directory for PenArm.
pub fn config_dir() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| SettingsError::ConfigDirectory("no config directory on this platform".to_string()))
}

/// Default config file location.
pub fn default_config_path() -> SettingsResult<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Default calibration file location.
pub fn default_calibration_path() -> SettingsResult<PathBuf> {
    Ok(config_dir()?.join("calibration.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.baud_rate, 115200);
        assert_eq!(config.motion.pen_lift_height, 16.0);
        assert!(config.connection.progress_interval().is_none());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut config = Config::new();
        config.motion.pen_down_feedrate = 25000.0;
        match config.validate() {
            Err(ValidationError::InvalidConfig { key, .. }) => {
                assert_eq!(key, "motion.pen_down_feedrate")
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut config = Config::new();
        config.connection.max_retries = 11;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.pipeline.smoothing_sigma = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.motion.max_commands = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.pipeline.style = DrawingStyle::ZigzagFill {
            spacing: 1e-9,
            max_area: 400.0,
        };
        match config.validate() {
            Err(ValidationError::InvalidConfig { key, .. }) => {
                assert_eq!(key, "pipeline.style.spacing")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_generator_config_uses_heights() {
        let generator = Config::new().generator_config(-2.0, 14.0);
        assert_eq!(generator.z_draw, -2.0);
        assert_eq!(generator.z_up, 14.0);
        assert_eq!(generator.max_commands, 5000);
        assert!(generator.validate().is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Config::new().save_to_file(Path::new("config.yaml")).unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedFormat(_)));
    }
}
