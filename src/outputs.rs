// Licensed under the Apache-2.0 license

//! Write-only auxiliary outputs driven from the bus.
//!
//! These are independent of the shuttle: they light signals, switch
//! turnouts and the like on behalf of the bus master.

use embedded_hal::i2c::{Error as _, ErrorKind as I2cErrorKind, I2c};
use embedded_hal::pwm::{Error as _, ErrorKind as PwmErrorKind, SetDutyCycle};

use crate::i2c::expander::{ExpanderError, Pcf8574Bank};

/// Where writes to the output registers end up.
pub trait OutputSink {
    type Error: core::fmt::Debug;

    /// Bit `i` switches local output `i` fully on or off.
    fn set_local_outputs(&mut self, bits: u8) -> Result<(), Self::Error>;

    fn set_expander_outputs(&mut self, device: u8, bits: u8) -> Result<(), Self::Error>;

    /// `value` of 255 is the channel's full duty cycle.
    fn set_pwm_duty(&mut self, channel: u8, value: u8) -> Result<(), Self::Error>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputError {
    Pwm(PwmErrorKind),
    Expander(I2cErrorKind),
    /// Local channel or expander index that is not fitted.
    NoSuchOutput(u8),
}

/// `N` local PWM-capable channels plus a bank of output expanders.
pub struct AuxOutputs<W: SetDutyCycle, I2C: I2c, const N: usize> {
    channels: [W; N],
    expanders: Pcf8574Bank<I2C>,
}

impl<W: SetDutyCycle, I2C: I2c, const N: usize> AuxOutputs<W, I2C, N> {
    pub fn new(channels: [W; N], expanders: Pcf8574Bank<I2C>) -> Self {
        Self { channels, expanders }
    }

    #[must_use]
    pub fn expanders(&self) -> &Pcf8574Bank<I2C> {
        &self.expanders
    }

    pub fn free(self) -> ([W; N], Pcf8574Bank<I2C>) {
        (self.channels, self.expanders)
    }
}

impl<W: SetDutyCycle, I2C: I2c, const N: usize> OutputSink for AuxOutputs<W, I2C, N> {
    type Error = OutputError;

    fn set_local_outputs(&mut self, bits: u8) -> Result<(), OutputError> {
        // Boards with fewer than 8 channels drop the high bits.
        for (i, channel) in self.channels.iter_mut().take(8).enumerate() {
            if bits & (1 << i) != 0 {
                channel.set_duty_cycle_fully_on()
            } else {
                channel.set_duty_cycle_fully_off()
            }
            .map_err(|e| OutputError::Pwm(e.kind()))?;
        }
        Ok(())
    }

    fn set_expander_outputs(&mut self, device: u8, bits: u8) -> Result<(), OutputError> {
        self.expanders.write(device, bits).map_err(|e| match e {
            ExpanderError::NoSuchDevice(d) => OutputError::NoSuchOutput(d),
            ExpanderError::Bus(e) => OutputError::Expander(e.kind()),
        })
    }

    fn set_pwm_duty(&mut self, channel: u8, value: u8) -> Result<(), OutputError> {
        let pwm = self
            .channels
            .get_mut(usize::from(channel))
            .ok_or(OutputError::NoSuchOutput(channel))?;
        pwm.set_duty_cycle_fraction(u16::from(value), u16::from(u8::MAX))
            .map_err(|e| OutputError::Pwm(e.kind()))
    }
}
