// Licensed under the Apache-2.0 license

//! I2C side of the shuttle controller.
//!
//! The device is a target on the control bus: [`listener::BusListener`]
//! blocks on bus events and queues them, [`handler::TargetHandler`] drains
//! the queue against the register table and answers reads. The two run on
//! separate tasks joined by a `heapless::spsc` queue. Output expanders hang
//! off a second bus on which the device is the controller.

pub mod expander;

#[cfg(feature = "i2c_target")]
pub mod common;
#[cfg(feature = "i2c_target")]
pub mod handler;
#[cfg(feature = "i2c_target")]
pub mod listener;
#[cfg(feature = "i2c_target")]
pub mod traits;

#[cfg(feature = "i2c_target")]
pub use common::{IncomingEvent, ListenError, TargetEvent};
#[cfg(feature = "i2c_target")]
pub use traits::{I2cTarget, I2cTargetCore, I2cTargetEventSync, I2cTargetReply};
