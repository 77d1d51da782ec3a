// Licensed under the Apache-2.0 license

//! Device configuration.
//!
//! All tunables live in one [`ShuttleConfig`], assembled through
//! [`ShuttleConfigBuilder`] so that defaults match the shipped firmware and
//! only the deviations need to be spelled out.

use crate::timer::Duration;
use fugit::HertzU32;

/// Default 7-bit target address on the control bus.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x28;

/// Maximum number of PCF8574-style output expanders.
pub const MAX_EXPANDERS: u8 = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Address is outside the 7-bit range or inside a reserved block.
    InvalidAddress(u8),
    /// More expanders than the register map can address.
    TooManyExpanders(u8),
    ZeroTickInterval,
    ZeroDebounce,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShuttleConfig {
    pub i2c_address: u8,
    /// Dwell before leaving S1 towards S3.
    pub dwell_at_s1: Duration,
    /// Dwell before leaving S4 towards S2.
    pub dwell_at_s4: Duration,
    pub tick_interval: Duration,
    pub motor_frequency: HertzU32,
    /// Pause between listener restarts after a bus failure.
    pub bus_retry_backoff: Duration,
    /// Consecutive equal samples required before an input changes; 1 disables debouncing.
    pub debounce_samples: u8,
    pub expander_count: u8,
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        ShuttleConfigBuilder::new().into_config()
    }
}

pub struct ShuttleConfigBuilder {
    i2c_address: u8,
    dwell_at_s1: Duration,
    dwell_at_s4: Duration,
    tick_interval: Duration,
    motor_frequency: HertzU32,
    bus_retry_backoff: Duration,
    debounce_samples: u8,
    expander_count: u8,
}

impl Default for ShuttleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShuttleConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            i2c_address: DEFAULT_I2C_ADDRESS,
            dwell_at_s1: Duration::secs(5),
            dwell_at_s4: Duration::secs(10),
            tick_interval: Duration::millis(1),
            motor_frequency: HertzU32::kHz(20),
            bus_retry_backoff: Duration::secs(1),
            debounce_samples: 1,
            expander_count: 0,
        }
    }
    #[must_use]
    pub fn i2c_address(mut self, address: u8) -> Self {
        self.i2c_address = address;
        self
    }
    #[must_use]
    pub fn dwell_at_s1(mut self, dwell: Duration) -> Self {
        self.dwell_at_s1 = dwell;
        self
    }
    #[must_use]
    pub fn dwell_at_s4(mut self, dwell: Duration) -> Self {
        self.dwell_at_s4 = dwell;
        self
    }
    #[must_use]
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
    #[must_use]
    pub fn motor_frequency(mut self, frequency: HertzU32) -> Self {
        self.motor_frequency = frequency;
        self
    }
    #[must_use]
    pub fn bus_retry_backoff(mut self, backoff: Duration) -> Self {
        self.bus_retry_backoff = backoff;
        self
    }
    #[must_use]
    pub fn debounce_samples(mut self, samples: u8) -> Self {
        self.debounce_samples = samples;
        self
    }
    #[must_use]
    pub fn expander_count(mut self, count: u8) -> Self {
        self.expander_count = count;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn build(self) -> Result<ShuttleConfig, ConfigError> {
        if !(0x08..=0x77).contains(&self.i2c_address) {
            return Err(ConfigError::InvalidAddress(self.i2c_address));
        }
        if self.expander_count > MAX_EXPANDERS {
            return Err(ConfigError::TooManyExpanders(self.expander_count));
        }
        if self.tick_interval.ticks() == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.debounce_samples == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        Ok(self.into_config())
    }

    fn into_config(self) -> ShuttleConfig {
        ShuttleConfig {
            i2c_address: self.i2c_address,
            dwell_at_s1: self.dwell_at_s1,
            dwell_at_s4: self.dwell_at_s4,
            tick_interval: self.tick_interval,
            motor_frequency: self.motor_frequency,
            bus_retry_backoff: self.bus_retry_backoff,
            debounce_samples: self.debounce_samples,
            expander_count: self.expander_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_firmware() {
        let config = ShuttleConfig::default();
        assert_eq!(config.i2c_address, 0x28);
        assert_eq!(config.dwell_at_s1, Duration::secs(5));
        assert_eq!(config.dwell_at_s4, Duration::secs(10));
        assert_eq!(config.tick_interval, Duration::millis(1));
        assert_eq!(config.motor_frequency, HertzU32::kHz(20));
        assert_eq!(config.bus_retry_backoff, Duration::secs(1));
        assert_eq!(config.debounce_samples, 1);
        assert_eq!(config.expander_count, 0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ShuttleConfigBuilder::new()
            .i2c_address(0x30)
            .dwell_at_s1(Duration::secs(2))
            .expander_count(2)
            .build()
            .unwrap();
        assert_eq!(config.i2c_address, 0x30);
        assert_eq!(config.dwell_at_s1, Duration::secs(2));
        assert_eq!(config.dwell_at_s4, Duration::secs(10));
        assert_eq!(config.expander_count, 2);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert_eq!(
            ShuttleConfigBuilder::new().i2c_address(0x03).build(),
            Err(ConfigError::InvalidAddress(0x03))
        );
        assert_eq!(
            ShuttleConfigBuilder::new().i2c_address(0x78).build(),
            Err(ConfigError::InvalidAddress(0x78))
        );
        assert_eq!(
            ShuttleConfigBuilder::new().expander_count(9).build(),
            Err(ConfigError::TooManyExpanders(9))
        );
        assert_eq!(
            ShuttleConfigBuilder::new()
                .tick_interval(Duration::millis(0))
                .build(),
            Err(ConfigError::ZeroTickInterval)
        );
        assert_eq!(
            ShuttleConfigBuilder::new().debounce_samples(0).build(),
            Err(ConfigError::ZeroDebounce)
        );
    }
}
