// Licensed under the Apache-2.0 license

//! Shuttle-train controller.
//!
//! Drives a single DC motor back and forth between two pairs of position
//! sensors and exposes live status plus a manual output channel through an
//! I2C target register interface.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`shuttle`] | Control loop: sensors in, motor commands out |
//! | [`motor`] | Direction/speed mapping onto two PWM channels |
//! | [`gpio`] | Active-low boundary sensors and the REV switch |
//! | [`indicator`] | State-to-color mapping for the status LED |
//! | [`registers`] | Register map shared with the bus handler |
//! | [`outputs`] | Write-only auxiliary outputs (local PWM, expanders) |
//! | [`i2c`] | Target-mode listener and event handler, expander driver |
//!
//! Every hardware dependency is a capability trait injected at
//! construction; a board crate supplies the implementations.

// Panic-prone patterns are only allowed in tests
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), no_std)]

pub mod common;
pub mod config;
pub mod gpio;
pub mod i2c;
pub mod indicator;
pub mod motor;
pub mod outputs;
pub mod registers;
pub mod shuttle;
pub mod timer;

#[cfg(test)]
mod tests;

pub use config::{ShuttleConfig, ShuttleConfigBuilder};
pub use shuttle::{ShuttleState, ShuttleStateMachine};
