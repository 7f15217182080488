//! PenArm Settings Crate
//!
//! Handles application configuration: loading, validation and persistence.

pub mod config;
pub mod error;

pub use config::{
    config_dir, default_calibration_path, default_config_path, Config, ConnectionSettings,
    MotionSettings, PipelineSettings,
};
pub use error::{SettingsError, SettingsResult};
