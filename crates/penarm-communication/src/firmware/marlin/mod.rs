//! Marlin firmware support for the arm.

pub mod controller;
pub mod response_parser;

pub use controller::{drain_replies, send_command, MarlinArm, MarlinArmConfig, LATE_REPLY_WINDOW};
pub use response_parser::{parse_position, MarlinResponse, MarlinResponseParser};
