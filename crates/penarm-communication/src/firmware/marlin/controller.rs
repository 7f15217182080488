//! Marlin arm controller
//!
//! Request/acknowledge exchange over a [`MotionTransport`] and the manual
//! arm commands used during calibration.

use super::response_parser::{MarlinResponse, MarlinResponseParser};
use crate::communication::{ArmChannel, ChannelGuard, MotionTransport};
use crate::protocol;
use async_trait::async_trait;
use penarm_core::{ArmControl, Error, HardwareError, Point3, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Send one line and wait for its acknowledgment.
///
/// Non-acknowledgment replies that arrive first are returned. A busy
/// keep-alive restarts the timeout. Error replies and garbled lines fail
/// the exchange; a silent arm fails with a single-attempt timeout.
pub async fn send_command(
    transport: &mut dyn MotionTransport,
    line: &str,
    timeout: Duration,
) -> std::result::Result<Vec<MarlinResponse>, HardwareError> {
    let parser = MarlinResponseParser::new();
    tracing::trace!("-> {}", line);
    transport.write_line(line).await?;

    let mut deadline = Instant::now() + timeout;
    let mut replies = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let reply = if remaining.is_zero() {
            None
        } else {
            transport.read_line(remaining).await?
        };
        let Some(raw) = reply else {
            return Err(HardwareError::Timeout {
                command: line.to_string(),
                timeout_ms: timeout.as_millis() as u64,
                attempts: 1,
            });
        };
        tracing::trace!("<- {}", raw);
        match parser.parse(&raw) {
            None => {}
            Some(MarlinResponse::Ok) => return Ok(replies),
            Some(MarlinResponse::Busy) => deadline = Instant::now() + timeout,
            Some(MarlinResponse::Error(_)) => {
                return Err(HardwareError::Rejected {
                    command: line.to_string(),
                    reply: raw.trim().to_string(),
                })
            }
            Some(MarlinResponse::Garbled(line)) => return Err(HardwareError::MalformedAck { line }),
            Some(other) => replies.push(other),
        }
    }
}

/// How long [`drain_replies`] waits for each further buffered line.
pub const LATE_REPLY_WINDOW: Duration = Duration::from_millis(20);

/// Consume replies that arrived after a timed-out exchange.
///
/// Returns true when a late `ok` shows the unanswered line was executed
/// after all, in which case it must not be sent again.
pub async fn drain_replies(
    transport: &mut dyn MotionTransport,
    line: &str,
) -> std::result::Result<bool, HardwareError> {
    let parser = MarlinResponseParser::new();
    let mut acked = false;
    while let Some(raw) = transport.read_line(LATE_REPLY_WINDOW).await? {
        tracing::trace!("<- {} (late)", raw);
        match parser.parse(&raw) {
            Some(MarlinResponse::Ok) => acked = true,
            Some(MarlinResponse::Error(_)) => {
                return Err(HardwareError::Rejected {
                    command: line.to_string(),
                    reply: raw.trim().to_string(),
                })
            }
            Some(MarlinResponse::Garbled(line)) => return Err(HardwareError::MalformedAck { line }),
            _ => {}
        }
    }
    Ok(acked)
}

/// Timeouts for manual commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarlinArmConfig {
    /// Timeout for ordinary commands.
    pub command_timeout: Duration,
    /// Timeout for the homing cycle.
    pub home_timeout: Duration,
}

impl Default for MarlinArmConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(5),
            home_timeout: Duration::from_secs(60),
        }
    }
}

/// Manual control of a Marlin arm over the shared channel
///
/// Every call fails with a busy error while a drawing job holds the channel.
#[derive(Debug, Clone)]
pub struct MarlinArm {
    channel: ArmChannel,
    config: MarlinArmConfig,
}

impl MarlinArm {
    /// Create a controller on a channel.
    pub fn new(channel: ArmChannel, config: MarlinArmConfig) -> Self {
        Self { channel, config }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &ArmChannel {
        &self.channel
    }

    /// Put the firmware into absolute positioning.
    pub async fn initialize(&self) -> Result<()> {
        self.command(protocol::ABSOLUTE_POSITIONING, self.config.command_timeout)
            .await
            .map(|_| ())
    }

    fn acquire(&self) -> Result<ChannelGuard> {
        if !self.channel.is_connected() {
            return Err(HardwareError::NotConnected.into());
        }
        Ok(self.channel.try_acquire()?)
    }

    async fn command(&self, line: &str, timeout: Duration) -> Result<Vec<MarlinResponse>> {
        let mut guard = self.acquire()?;
        match send_command(&mut **guard, line, timeout).await {
            Ok(replies) => Ok(replies),
            Err(e) => {
                if matches!(e, HardwareError::Disconnected { .. }) {
                    self.channel.mark_disconnected();
                }
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ArmControl for MarlinArm {
    fn name(&self) -> String {
        self.channel.name().to_string()
    }

    fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    async fn home(&self) -> Result<()> {
        tracing::info!("Homing {}", self.channel.name());
        self.command(protocol::HOME, self.config.home_timeout).await?;
        Ok(())
    }

    async fn unlock_motors(&self) -> Result<()> {
        self.command(protocol::UNLOCK_MOTORS, self.config.command_timeout)
            .await?;
        Ok(())
    }

    async fn lock_motors(&self) -> Result<()> {
        self.command(protocol::LOCK_MOTORS, self.config.command_timeout)
            .await?;
        Ok(())
    }

    async fn current_position(&self) -> Result<Point3> {
        let replies = self
            .command(protocol::REPORT_POSITION, self.config.command_timeout)
            .await?;
        replies
            .into_iter()
            .find_map(|reply| match reply {
                MarlinResponse::Position(p) => Some(p),
                _ => None,
            })
            .ok_or_else(|| {
                Error::from(HardwareError::MalformedAck {
                    line: "M114 reply without position".to_string(),
                })
            })
    }

    async fn move_to(&self, target: Point3, feedrate: f64) -> Result<()> {
        self.command(&protocol::move_to(target, feedrate), self.config.command_timeout)
            .await?;
        Ok(())
    }
}
