// Licensed under the Apache-2.0 license

//! Status LED.
//!
//! A single addressable RGB LED shows the current shuttle state. It is the
//! only on-board diagnostic, so a failed write is reported to the caller
//! instead of being retried or ignored.

use crate::shuttle::ShuttleState;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Shown from power-on until the control loop enters its first state.
pub const BOOT_COLOR: Rgb = Rgb::new(165, 165, 165);

/// Fixed color for each shuttle state.
#[must_use]
pub const fn color_for(state: ShuttleState) -> Rgb {
    match state {
        ShuttleState::Initial => Rgb::new(32, 32, 32),
        ShuttleState::DrivingToS2 => Rgb::new(165, 0, 165),
        ShuttleState::DrivingToS1 => Rgb::new(165, 0, 0),
        ShuttleState::StoppedInS1 => Rgb::new(165, 165, 0),
        ShuttleState::DrivingToS3 => Rgb::new(0, 165, 0),
        ShuttleState::DrivingToS4 => Rgb::new(0, 255, 0),
        ShuttleState::StoppedInS4 => Rgb::new(0, 0, 255),
    }
}

/// A single addressable RGB LED (WS2812 or similar).
pub trait RgbLed {
    type Error: core::fmt::Debug;

    /// Blocking write of one color.
    fn write(&mut self, color: Rgb) -> Result<(), Self::Error>;
}

pub struct StatusIndicator<L: RgbLed> {
    led: L,
}

impl<L: RgbLed> StatusIndicator<L> {
    pub fn new(led: L) -> Self {
        Self { led }
    }

    /// # Errors
    ///
    /// Returns the LED driver error unchanged.
    pub fn boot(&mut self) -> Result<(), L::Error> {
        self.led.write(BOOT_COLOR)
    }

    /// # Errors
    ///
    /// Returns the LED driver error unchanged.
    pub fn set(&mut self, state: ShuttleState) -> Result<(), L::Error> {
        self.led.write(color_for(state))
    }

    pub fn free(self) -> L {
        self.led
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockLed;

    #[test]
    fn test_every_state_has_a_distinct_color() {
        for (i, a) in ShuttleState::ALL.iter().enumerate() {
            for b in ShuttleState::ALL.iter().skip(i + 1) {
                assert_ne!(color_for(*a), color_for(*b), "{a:?} vs {b:?}");
            }
            assert_ne!(color_for(*a), BOOT_COLOR);
        }
    }

    #[test]
    fn test_set_writes_state_color() {
        let led = MockLed::new();
        let mut indicator = StatusIndicator::new(led.clone());
        indicator.boot().unwrap();
        indicator.set(ShuttleState::StoppedInS4).unwrap();

        assert_eq!(led.history(), vec![BOOT_COLOR, Rgb::new(0, 0, 255)]);
    }

    #[test]
    fn test_write_failure_is_returned() {
        let led = MockLed::new();
        led.fail();
        let mut indicator = StatusIndicator::new(led);
        assert!(indicator.set(ShuttleState::Initial).is_err());
    }
}
