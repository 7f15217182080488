//! # PenArm
//!
//! Drives a pen-holding robot arm to draw vector artwork.
//!
//! ## Architecture
//!
//! PenArm is organized as a workspace with multiple crates:
//!
//! 1. **penarm-core** - Geometry and motion types, errors, progress event bus
//! 2. **penarm-camtools** - Stroke joining, ordering, simplification, program generation
//! 3. **penarm-calibration** - Calibration state machine, persistence, artwork mapping
//! 4. **penarm-communication** - Serial transport, Marlin protocol, job executor
//! 5. **penarm-settings** - Configuration files
//! 6. **penarm** - Planning pipeline, plotter session and the command line tool

pub mod pipeline;
pub mod session;

pub use pipeline::{plan_drawing, plan_test_pattern, DrawingPlan};
pub use session::{arm_config, executor_config, PlotterSession};

pub use penarm_calibration::{
    ArtworkMapping, CalibrationFrame, CalibrationManager, CalibrationState, CalibrationStore,
};
pub use penarm_communication::{
    encode_program, list_ports, CancelToken, JobHandle, MotionExecutor, MotionTransport,
};
pub use penarm_core::{
    Artwork, Error, EventBus, JobId, JobStatus, MotionProgram, ProgressEvent, Result,
};
pub use penarm_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, multi-line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support, INFO by default
/// - Output on stderr so G-code written to stdout stays clean
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .pretty();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .json();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
