//! # Event Bus Module
//!
//! Publish/subscribe channel for decoupled communication between the
//! executor, the calibration session and whoever displays progress.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use penarm_core::event_bus::EventBus;
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe_job(job_id, |progress| {
//!     println!("{}/{}", progress.completed, progress.total);
//! });
//!
//! // ... later
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
