//! Calibration manager and operator sessions.
//!
//! The manager owns the process-wide calibration state. Readers (mapping,
//! drawing area) take a short lock; every state change goes through a
//! [`CalibrationSession`], and only one session can be open at a time.

use crate::frame::{check_rectangle, CalibrationFrame, DrawingArea, DEFAULT_RESTING};
use crate::mapper::ArtworkMapping;
use crate::state::{CalibrationState, CapturePhase};
use crate::store::{CalibrationStore, PersistedCalibration};
use parking_lot::Mutex;
use penarm_core::{
    AppEvent, ArmControl, BoundingBox, CalibrationEvent, ConcurrencyError, EventBus, HardwareError,
    Point3, Result, ValidationError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    state: CalibrationState,
    phase: CapturePhase,
    corner1: Option<Point3>,
    corner2: Option<Point3>,
    resting: Option<Point3>,
    frame: Option<CalibrationFrame>,
    persisted: Option<PersistedCalibration>,
}

/// Process-wide calibration state
pub struct CalibrationManager {
    inner: Mutex<Inner>,
    session_active: AtomicBool,
    store: CalibrationStore,
    events: Option<Arc<EventBus>>,
}

impl CalibrationManager {
    /// Create a manager and load whatever the store holds.
    ///
    /// A corrupt store is logged and treated as empty.
    pub fn open(store: CalibrationStore, events: Option<Arc<EventBus>>) -> Self {
        let persisted = match store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("Ignoring unreadable calibration data in {:?}: {}", store, e);
                None
            }
        };
        if let Some(record) = &persisted {
            tracing::info!(
                "Loaded calibration (complete: {})",
                record.is_complete()
            );
        }
        Self {
            inner: Mutex::new(Inner {
                persisted,
                ..Inner::default()
            }),
            session_active: AtomicBool::new(false),
            store,
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> CalibrationState {
        self.inner.lock().state
    }

    /// Current capture phase.
    pub fn capture_phase(&self) -> CapturePhase {
        self.inner.lock().phase
    }

    /// The frame, once calibrated.
    pub fn frame(&self) -> Option<CalibrationFrame> {
        let inner = self.inner.lock();
        match inner.state {
            CalibrationState::Calibrated => inner.frame,
            _ => None,
        }
    }

    /// Data loaded from, or last written to, the store.
    pub fn persisted(&self) -> Option<PersistedCalibration> {
        self.inner.lock().persisted
    }

    /// Mapping for an artwork box; requires the Calibrated state.
    pub fn mapping(&self, source: &BoundingBox) -> std::result::Result<ArtworkMapping, ValidationError> {
        self.require_frame()
            .map(|frame| ArtworkMapping::new(&frame, *source))
    }

    /// The calibrated drawing rectangle.
    pub fn drawing_area(&self) -> std::result::Result<DrawingArea, ValidationError> {
        self.require_frame().map(|frame| frame.drawing_area())
    }

    /// Where jobs park the arm.
    pub fn resting_position(&self) -> std::result::Result<Point3, ValidationError> {
        self.require_frame().map(|frame| frame.resting)
    }

    fn require_frame(&self) -> std::result::Result<CalibrationFrame, ValidationError> {
        let inner = self.inner.lock();
        match (inner.state, inner.frame) {
            (CalibrationState::Calibrated, Some(frame)) => Ok(frame),
            (state, _) => Err(ValidationError::NotCalibrated {
                state: state.to_string(),
            }),
        }
    }

    /// Open the single calibration session.
    pub fn begin_session(&self) -> std::result::Result<CalibrationSession<'_>, ConcurrencyError> {
        if self
            .session_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ConcurrencyError::CalibrationSessionActive);
        }
        tracing::debug!("Calibration session opened");
        Ok(CalibrationSession { manager: self })
    }

    /// True while a session is open.
    pub fn session_active(&self) -> bool {
        self.session_active.load(Ordering::Acquire)
    }

    fn publish(&self, event: CalibrationEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.publish(AppEvent::Calibration(event));
        }
    }
}

impl std::fmt::Debug for CalibrationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationManager")
            .field("state", &self.state())
            .field("store", &self.store)
            .finish()
    }
}

/// Exclusive handle for driving the calibration procedure
///
/// Dropping the session releases it.
pub struct CalibrationSession<'a> {
    manager: &'a CalibrationManager,
}

impl<'a> CalibrationSession<'a> {
    /// Current state.
    pub fn state(&self) -> CalibrationState {
        self.manager.state()
    }

    /// Disconnected → Connected, once the arm link is up.
    pub fn connect(&self, arm: &dyn ArmControl) -> Result<()> {
        self.check(&[CalibrationState::Disconnected], "connect")?;
        if !arm.is_connected() {
            return Err(HardwareError::NotConnected.into());
        }
        self.transition(CalibrationState::Connected);
        Ok(())
    }

    /// Connected → Homed.
    pub async fn home(&self, arm: &dyn ArmControl) -> Result<()> {
        self.check(&[CalibrationState::Connected], "home")?;
        arm.home().await?;
        self.transition(CalibrationState::Homed);
        Ok(())
    }

    /// Release the motors so the operator can position the arm.
    pub async fn unlock_motors(&self, arm: &dyn ArmControl) -> Result<()> {
        self.check_capture("unlock motors", CapturePhase::Idle)?;
        arm.unlock_motors().await?;
        self.manager.inner.lock().phase = CapturePhase::MotorsUnlocked;
        Ok(())
    }

    /// Hold the arm at the operator's position.
    pub async fn lock_motors(&self, arm: &dyn ArmControl) -> Result<()> {
        self.check_capture("lock motors", CapturePhase::MotorsUnlocked)?;
        arm.lock_motors().await?;
        self.manager.inner.lock().phase = CapturePhase::MotorsLocked;
        Ok(())
    }

    /// Record the arm position as the next reference point.
    pub async fn capture(&self, arm: &dyn ArmControl) -> Result<Point3> {
        let (state, label) = self.check_capture("capture", CapturePhase::MotorsLocked)?;
        let position = arm.current_position().await?;

        let next = {
            let mut inner = self.manager.inner.lock();
            inner.phase = CapturePhase::Idle;
            match state {
                CalibrationState::Homed => {
                    inner.corner1 = Some(position);
                    CalibrationState::Corner1Set
                }
                CalibrationState::Corner1Set => {
                    let corner1 = inner.corner1.ok_or_else(|| ValidationError::MissingCalibration {
                        field: "corner1".to_string(),
                    })?;
                    check_rectangle(corner1, position)?;
                    inner.corner2 = Some(position);
                    CalibrationState::Corner2Set
                }
                _ => {
                    inner.resting = Some(position);
                    CalibrationState::RestingSet
                }
            }
        };

        tracing::info!("Captured {} at {}", label, position);
        self.manager.publish(CalibrationEvent::PointCaptured {
            label: label.to_string(),
            x: position.x,
            y: position.y,
            z: position.z,
        });
        self.transition(next);
        Ok(position)
    }

    /// Corner2Set → RestingSet using the default resting position.
    pub fn use_default_resting(&self) -> Result<()> {
        self.check(&[CalibrationState::Corner2Set], "use default resting")?;
        {
            let mut inner = self.manager.inner.lock();
            inner.resting = Some(DEFAULT_RESTING);
            inner.phase = CapturePhase::Idle;
        }
        self.transition(CalibrationState::RestingSet);
        Ok(())
    }

    /// RestingSet → Calibrated; derives pen heights and persists the frame.
    pub fn finalize(&self, pen_lift: f64) -> Result<CalibrationFrame> {
        self.check(&[CalibrationState::RestingSet], "finalize")?;
        let (corner1, corner2, resting) = {
            let inner = self.manager.inner.lock();
            (inner.corner1, inner.corner2, inner.resting)
        };
        let missing = |field: &str| ValidationError::MissingCalibration {
            field: field.to_string(),
        };
        let frame = CalibrationFrame::new(
            corner1.ok_or_else(|| missing("corner1"))?,
            corner2.ok_or_else(|| missing("corner2"))?,
            resting.ok_or_else(|| missing("resting"))?,
            pen_lift,
        )?;
        self.manager.store.save(&frame)?;
        {
            let mut inner = self.manager.inner.lock();
            inner.frame = Some(frame);
            inner.persisted = Some(PersistedCalibration::from_frame(&frame));
        }
        self.transition(CalibrationState::Calibrated);
        Ok(frame)
    }

    /// Homed → Calibrated from the persisted frame.
    pub fn restore(&self) -> Result<CalibrationFrame> {
        self.check(&[CalibrationState::Homed], "restore")?;
        let record = match self.manager.persisted() {
            Some(record) => record,
            None => self.manager.store.load()?.unwrap_or_default(),
        };
        let frame = record.to_frame()?;
        {
            let mut inner = self.manager.inner.lock();
            inner.corner1 = Some(frame.corner1);
            inner.corner2 = Some(frame.corner2);
            inner.resting = Some(frame.resting);
            inner.frame = Some(frame);
            inner.persisted = Some(record);
        }
        self.transition(CalibrationState::Calibrated);
        Ok(frame)
    }

    /// Back to Homed, discarding captured and persisted data.
    pub fn reset(&self) -> Result<()> {
        let state = self.state();
        if !state.is_homed() {
            return Err(self.invalid(state, "reset").into());
        }
        self.manager.store.clear()?;
        {
            let mut inner = self.manager.inner.lock();
            inner.phase = CapturePhase::Idle;
            inner.corner1 = None;
            inner.corner2 = None;
            inner.resting = None;
            inner.frame = None;
            inner.persisted = None;
        }
        self.transition(CalibrationState::Homed);
        Ok(())
    }

    /// Drop back to Disconnected; the persisted frame stays available.
    pub fn disconnect(&self) {
        self.manager.inner.lock().phase = CapturePhase::Idle;
        self.transition(CalibrationState::Disconnected);
    }

    fn check(
        &self,
        allowed: &[CalibrationState],
        action: &str,
    ) -> std::result::Result<CalibrationState, ValidationError> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(state)
        } else {
            Err(self.invalid(state, action))
        }
    }

    fn check_capture(
        &self,
        action: &str,
        phase: CapturePhase,
    ) -> std::result::Result<(CalibrationState, &'static str), ValidationError> {
        let inner = self.manager.inner.lock();
        match inner.state.next_capture() {
            Some(label) if inner.phase == phase => Ok((inner.state, label)),
            Some(label) => Err(ValidationError::InvalidTransition {
                state: format!("{} ({:?})", inner.state, inner.phase),
                action: format!("{} {}", action, label),
            }),
            None => Err(self.invalid(inner.state, action)),
        }
    }

    fn invalid(&self, state: CalibrationState, action: &str) -> ValidationError {
        ValidationError::InvalidTransition {
            state: state.to_string(),
            action: action.to_string(),
        }
    }

    fn transition(&self, to: CalibrationState) {
        let from = std::mem::replace(&mut self.manager.inner.lock().state, to);
        if from == to {
            return;
        }
        tracing::info!("Calibration {} -> {}", from, to);
        self.manager.publish(CalibrationEvent::StateChanged {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
}

impl Drop for CalibrationSession<'_> {
    fn drop(&mut self) {
        self.manager.session_active.store(false, Ordering::Release);
        tracing::debug!("Calibration session closed");
    }
}
