// Licensed under the Apache-2.0 license

//! DC motor control through a two-input H-bridge.
//!
//! | Command | Active input | Other input |
//! |---------|--------------|-------------|
//! | forward | PWM, `Top/3` or `2*Top/3` | plain low |
//! | backward | plain low | PWM, `Top/3` or `2*Top/3` |
//! | stop | plain low | plain low |
//!
//! Duty never reaches 100% so the locomotive is spared abrupt torque.
//! Which physical input counts as "forward" is swapped by
//! [`MotorController::set_reversed`] so that forward always heads towards
//! S3/S4 regardless of how the track is wired.

use embedded_hal::pwm::SetDutyCycle;
use fugit::HertzU32;

/// One H-bridge input that can either run PWM or sit at a plain low level.
///
/// [`SetDutyCycle::max_duty_cycle`] is the channel's counter top; all duty
/// values handed to the channel are fractions of it.
///
/// Boards whose two inputs have distinct HAL types wrap them in an enum with
/// one variant per pin so that both sides share this implementation.
pub trait DriveChannel: SetDutyCycle {
    /// Route the pin to its PWM function running at `frequency`.
    fn configure_pwm(&mut self, frequency: HertzU32) -> Result<(), Self::Error>;

    /// Detach the PWM function and drive the pin as a low digital output.
    fn force_low(&mut self) -> Result<(), Self::Error>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Speed {
    /// Approach speed between the inner and outer sensor.
    Reduced,
    /// Cruising speed across the segment.
    Full,
}

impl Speed {
    /// Duty value for a channel whose counter tops out at `top`.
    #[must_use]
    pub const fn duty(self, top: u16) -> u16 {
        let top = top as u32;
        let duty = match self {
            Speed::Reduced => top / 3,
            Speed::Full => 2 * top / 3,
        };
        duty as u16
    }
}

pub struct MotorController<C: DriveChannel> {
    forward: C,
    backward: C,
    reversed: bool,
    frequency: HertzU32,
}

impl<C: DriveChannel> MotorController<C> {
    /// `in1` drives forward and `in2` backward until reversed.
    pub fn new(in1: C, in2: C, frequency: HertzU32) -> Self {
        Self {
            forward: in1,
            backward: in2,
            reversed: false,
            frequency,
        }
    }

    /// # Errors
    ///
    /// Propagates the first channel failure.
    pub fn drive_forward(&mut self, speed: Speed) -> Result<(), C::Error> {
        Self::drive(&mut self.forward, &mut self.backward, speed, self.frequency)
    }

    /// # Errors
    ///
    /// Propagates the first channel failure.
    pub fn drive_backward(&mut self, speed: Speed) -> Result<(), C::Error> {
        Self::drive(&mut self.backward, &mut self.forward, speed, self.frequency)
    }

    /// # Errors
    ///
    /// Propagates the first channel failure.
    pub fn stop(&mut self) -> Result<(), C::Error> {
        self.forward.force_low()?;
        self.backward.force_low()
    }

    /// Select which physical input means forward.
    ///
    /// Call only while stopped; a running channel keeps running after the
    /// swap.
    pub fn set_reversed(&mut self, reversed: bool) {
        if reversed != self.reversed {
            core::mem::swap(&mut self.forward, &mut self.backward);
            self.reversed = reversed;
        }
    }

    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Release the channels in their original (`in1`, `in2`) order.
    pub fn free(self) -> (C, C) {
        if self.reversed {
            (self.backward, self.forward)
        } else {
            (self.forward, self.backward)
        }
    }

    fn drive(
        active: &mut C,
        inactive: &mut C,
        speed: Speed,
        frequency: HertzU32,
    ) -> Result<(), C::Error> {
        inactive.force_low()?;
        active.configure_pwm(frequency)?;
        let duty = speed.duty(active.max_duty_cycle());
        active.set_duty_cycle(duty)
    }
}
