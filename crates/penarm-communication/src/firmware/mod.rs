//! Firmware-specific implementations.

pub mod marlin;
