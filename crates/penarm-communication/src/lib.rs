//! # PenArm Communication
//!
//! Everything between a motion program and the arm: the serial line
//! transport, the Marlin dialect and reply parser, manual arm control and
//! the job executor with retry, cancellation and safe-return.

pub mod communication;
pub mod executor;
pub mod firmware;
pub mod protocol;

pub use communication::{
    list_ports, ArmChannel, ChannelGuard, MotionTransport, SerialPortInfo, SerialTransport,
};
pub use executor::{CancelToken, ExecutorConfig, JobHandle, MotionExecutor};
pub use firmware::marlin::{
    drain_replies, send_command, MarlinArm, MarlinArmConfig, MarlinResponse, MarlinResponseParser,
};
pub use protocol::{encode_command, encode_program};
