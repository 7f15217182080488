//! Plotter session: configuration, calibration and the arm link together.

use crate::pipeline::{plan_drawing, plan_test_pattern, DrawingPlan};
use penarm_calibration::{CalibrationFrame, CalibrationManager, CalibrationStore};
use penarm_communication::{
    ArmChannel, ExecutorConfig, JobHandle, MarlinArm, MarlinArmConfig, MotionExecutor,
    MotionTransport, SerialTransport,
};
use penarm_core::{
    AppEvent, Artwork, ConnectionEvent, EventBus, HardwareError, Result, ValidationError,
};
use penarm_settings::{Config, ConnectionSettings};
use std::sync::Arc;

/// Executor settings from the connection section.
pub fn executor_config(settings: &ConnectionSettings) -> ExecutorConfig {
    ExecutorConfig {
        command_timeout: settings.command_timeout(),
        max_retries: settings.max_retries,
        retry_backoff: settings.retry_backoff(),
        progress_interval: settings.progress_interval(),
        ..ExecutorConfig::default()
    }
}

/// Manual command timeouts from the connection section.
pub fn arm_config(settings: &ConnectionSettings) -> MarlinArmConfig {
    MarlinArmConfig {
        command_timeout: settings.command_timeout(),
        home_timeout: settings.home_timeout(),
    }
}

struct ArmLink {
    arm: MarlinArm,
    executor: MotionExecutor,
}

/// Everything one operator works with
pub struct PlotterSession {
    config: Config,
    bus: Arc<EventBus>,
    calibration: Arc<CalibrationManager>,
    link: Option<ArmLink>,
}

impl PlotterSession {
    /// Create a session; calibration data is loaded from `store`.
    pub fn new(config: Config, store: CalibrationStore) -> Self {
        let bus = Arc::new(EventBus::new());
        let calibration = Arc::new(CalibrationManager::open(store, Some(bus.clone())));
        Self {
            config,
            bus,
            calibration,
            link: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Event bus for progress, calibration and connection events.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Calibration state.
    pub fn calibration(&self) -> &Arc<CalibrationManager> {
        &self.calibration
    }

    /// True while an arm link is open.
    pub fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.arm.channel().is_connected())
    }

    /// Attach a transport and switch the firmware to absolute positioning.
    pub async fn connect<T: MotionTransport + 'static>(&mut self, transport: T) -> Result<()> {
        let channel = ArmChannel::new(transport);
        let arm = MarlinArm::new(channel.clone(), arm_config(&self.config.connection));
        arm.initialize().await?;
        let executor = MotionExecutor::new(
            channel.clone(),
            self.bus.clone(),
            executor_config(&self.config.connection),
        );
        tracing::info!("Connected to {}", channel.name());
        let _ = self.bus.publish(AppEvent::Connection(ConnectionEvent::Connected {
            port: channel.name().to_string(),
        }));
        self.link = Some(ArmLink { arm, executor });
        Ok(())
    }

    /// Open the serial port given, or the configured one.
    pub async fn connect_serial(&mut self, port: Option<&str>) -> Result<()> {
        let port = port
            .map(str::to_string)
            .or_else(|| self.config.connection.port.clone())
            .ok_or_else(|| ValidationError::InvalidConfig {
                key: "connection.port".to_string(),
                reason: "no serial port configured".to_string(),
            })?;
        let transport = SerialTransport::open(&port, self.config.connection.baud_rate)?;
        self.connect(transport).await
    }

    /// Close the link; calibration drops back to Disconnected.
    pub fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            let port = link.arm.channel().name().to_string();
            tracing::info!("Disconnected from {}", port);
            let _ = self
                .bus
                .publish(AppEvent::Connection(ConnectionEvent::Disconnected { port }));
        }
        match self.calibration.begin_session() {
            Ok(session) => session.disconnect(),
            Err(e) => tracing::warn!("Calibration state not reset on disconnect: {}", e),
        }
    }

    /// Manual arm control.
    pub fn arm(&self) -> Result<&MarlinArm> {
        self.link
            .as_ref()
            .map(|link| &link.arm)
            .ok_or_else(|| HardwareError::NotConnected.into())
    }

    /// The job executor.
    pub fn executor(&self) -> Result<&MotionExecutor> {
        self.link
            .as_ref()
            .map(|link| &link.executor)
            .ok_or_else(|| HardwareError::NotConnected.into())
    }

    fn frame(&self) -> Result<CalibrationFrame> {
        self.calibration.frame().ok_or_else(|| {
            ValidationError::NotCalibrated {
                state: self.calibration.state().to_string(),
            }
            .into()
        })
    }

    /// Plan an artwork against the current calibration.
    pub fn plan(&self, artwork: &Artwork) -> Result<DrawingPlan> {
        plan_drawing(artwork, &self.config, &self.frame()?)
    }

    /// Plan and submit an artwork.
    pub fn start_drawing(&self, artwork: &Artwork) -> Result<JobHandle> {
        let frame = self.frame()?;
        let plan = plan_drawing(artwork, &self.config, &frame)?;
        self.executor()?.submit(plan.program, frame.resting)
    }

    /// Draw the calibration test pattern.
    pub fn start_test_pattern(&self) -> Result<JobHandle> {
        let frame = self.frame()?;
        let program = plan_test_pattern(&self.config, &frame)?;
        self.executor()?.submit(program, frame.resting)
    }
}

impl std::fmt::Debug for PlotterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlotterSession")
            .field("calibration", &self.calibration)
            .field("connected", &self.is_connected())
            .finish()
    }
}
