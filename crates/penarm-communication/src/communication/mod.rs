//! Line transport and the shared arm channel.
//!
//! A [`MotionTransport`] moves text lines to and from the arm. The
//! [`ArmChannel`] wraps the single transport of a connection so that a
//! drawing job or a manual command owns it exclusively.

pub mod serial;

use async_trait::async_trait;
use penarm_core::{ConcurrencyError, HardwareError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use serial::{list_ports, SerialPortInfo, SerialTransport};

/// Bidirectional line-oriented link to the arm firmware
#[async_trait]
pub trait MotionTransport: Send {
    /// Name of the link, usually the port.
    fn name(&self) -> String;

    /// Send one line; the terminator is added by the transport.
    async fn write_line(&mut self, line: &str) -> Result<(), HardwareError>;

    /// Wait for the next line.
    ///
    /// Returns `Ok(None)` when nothing complete arrived within `timeout`.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, HardwareError>;
}

/// Exclusive access to the transport
pub type ChannelGuard = OwnedMutexGuard<Box<dyn MotionTransport>>;

/// The single command channel of a connected arm
#[derive(Clone)]
pub struct ArmChannel {
    transport: Arc<Mutex<Box<dyn MotionTransport>>>,
    name: String,
    connected: Arc<AtomicBool>,
}

impl ArmChannel {
    /// Wrap a transport.
    pub fn new<T: MotionTransport + 'static>(transport: T) -> Self {
        let name = transport.name();
        Self {
            transport: Arc::new(Mutex::new(Box::new(transport))),
            name,
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Link name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// False once an I/O failure was seen.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Record a link failure.
    pub fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            tracing::warn!("Arm link {} marked disconnected", self.name);
        }
    }

    /// Take the channel without waiting.
    pub fn try_acquire(&self) -> Result<ChannelGuard, ConcurrencyError> {
        self.transport
            .clone()
            .try_lock_owned()
            .map_err(|_| ConcurrencyError::ChannelBusy)
    }

    /// True while a job or command holds the channel.
    pub fn is_busy(&self) -> bool {
        self.transport.try_lock().is_err()
    }
}

impl std::fmt::Debug for ArmChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmChannel")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
