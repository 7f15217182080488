//! Serial port transport
//!
//! Provides the USB serial link to the arm:
//! - Port enumeration and discovery
//! - Line framing over the raw byte stream
//! - Blocking port I/O moved off the async runtime

use super::MotionTransport;
use async_trait::async_trait;
use parking_lot::Mutex;
use penarm_core::{Error, HardwareError, Result};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            vid: None,
            pid: None,
        }
    }
}

/// List serial ports the arm can be attached to
///
/// Filters to USB serial patterns:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        Error::other(format!("Failed to enumerate ports: {}", e))
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_arm_port(&port.port_name))
        .map(|port| {
            let mut info = SerialPortInfo::new(&port.port_name, port_description(port));
            if let serialport::SerialPortType::UsbPort(usb) = &port.port_type {
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
                info.manufacturer = usb.manufacturer.clone();
            }
            info
        })
        .collect())
}

/// Check if a port name looks like a USB serial device
pub fn is_arm_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }
    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

struct PortState {
    port: Box<dyn serialport::SerialPort>,
    pending: Vec<u8>,
}

impl PortState {
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        Some(
            String::from_utf8_lossy(&raw)
                .trim_end_matches(['\r', '\n'])
                .to_string(),
        )
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            match self.port.read(&mut buf) {
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// Serial link to the arm
pub struct SerialTransport {
    port_name: String,
    state: Arc<Mutex<PortState>>,
}

impl SerialTransport {
    /// Open a port at the given baud rate.
    pub fn open(port_name: &str, baud_rate: u32) -> std::result::Result<Self, HardwareError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(10)) // Short timeout for non-blocking reads
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", port_name, e);
                HardwareError::PortOpen {
                    port: port_name.to_string(),
                    reason: e.to_string(),
                }
            })?;
        tracing::info!("Opened {} at {} baud", port_name, baud_rate);
        Ok(Self {
            port_name: port_name.to_string(),
            state: Arc::new(Mutex::new(PortState {
                port,
                pending: Vec::new(),
            })),
        })
    }

    fn disconnected(&self, e: impl std::fmt::Display) -> HardwareError {
        HardwareError::Disconnected {
            reason: format!("{}: {}", self.port_name, e),
        }
    }
}

#[async_trait]
impl MotionTransport for SerialTransport {
    fn name(&self) -> String {
        self.port_name.clone()
    }

    async fn write_line(&mut self, line: &str) -> std::result::Result<(), HardwareError> {
        let state = self.state.clone();
        let data = format!("{}\n", line);
        tokio::task::spawn_blocking(move || {
            let mut state = state.lock();
            state.port.write_all(data.as_bytes())?;
            state.port.flush()
        })
        .await
        .map_err(|e| self.disconnected(e))?
        .map_err(|e| self.disconnected(e))
    }

    async fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<Option<String>, HardwareError> {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || state.lock().read_line(timeout))
            .await
            .map_err(|e| self.disconnected(e))?
            .map_err(|e| self.disconnected(e))
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SerialTransport({})", self.port_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_patterns() {
        assert!(is_arm_port("COM3"));
        assert!(is_arm_port("/dev/ttyACM0"));
        assert!(is_arm_port("/dev/ttyUSB1"));
        assert!(is_arm_port("/dev/cu.usbmodem1421"));
        assert!(!is_arm_port("COM"));
        assert!(!is_arm_port("COMX"));
        assert!(!is_arm_port("/dev/ttyS0"));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let err = SerialTransport::open("/dev/ttyACM-does-not-exist", 115200).unwrap_err();
        assert!(matches!(err, HardwareError::PortOpen { .. }));
    }
}
