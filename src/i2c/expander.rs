// Licensed under the Apache-2.0 license

//! PCF8574-compatible 8-bit output expanders on a controller-mode bus.
//!
//! Expander `n` answers at `base + n`. A write is the single port byte; the
//! part has no register pointer.

use embedded_hal::i2c::I2c;

use crate::config::MAX_EXPANDERS;

/// Address of expander 0 with all address straps low.
pub const PCF8574_BASE_ADDRESS: u8 = 0x20;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExpanderError<E> {
    NoSuchDevice(u8),
    Bus(E),
}

pub struct Pcf8574Bank<I2C: I2c> {
    bus: I2C,
    base_address: u8,
    count: u8,
    shadow: [u8; MAX_EXPANDERS as usize],
}

impl<I2C: I2c> Pcf8574Bank<I2C> {
    /// `count` is clamped to [`MAX_EXPANDERS`].
    pub fn new(bus: I2C, count: u8) -> Self {
        Self::with_base_address(bus, PCF8574_BASE_ADDRESS, count)
    }

    pub fn with_base_address(bus: I2C, base_address: u8, count: u8) -> Self {
        Self {
            bus,
            base_address,
            count: count.min(MAX_EXPANDERS),
            shadow: [0; MAX_EXPANDERS as usize],
        }
    }

    #[must_use]
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Bus address of expander `device`, if fitted.
    #[must_use]
    pub fn address(&self, device: u8) -> Option<u8> {
        (device < self.count).then(|| self.base_address.wrapping_add(device))
    }

    /// # Errors
    ///
    /// [`ExpanderError::NoSuchDevice`] for an index past the fitted count,
    /// [`ExpanderError::Bus`] if the transfer fails.
    pub fn write(&mut self, device: u8, bits: u8) -> Result<(), ExpanderError<I2C::Error>> {
        let address = self.address(device).ok_or(ExpanderError::NoSuchDevice(device))?;
        self.bus.write(address, &[bits]).map_err(ExpanderError::Bus)?;
        if let Some(slot) = self.shadow.get_mut(usize::from(device)) {
            *slot = bits;
        }
        Ok(())
    }

    /// Last value successfully written to `device`.
    #[must_use]
    pub fn last_written(&self, device: u8) -> Option<u8> {
        if device < self.count {
            self.shadow.get(usize::from(device)).copied()
        } else {
            None
        }
    }

    pub fn free(self) -> I2C {
        self.bus
    }
}
