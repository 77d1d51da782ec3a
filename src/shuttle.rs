// Licensed under the Apache-2.0 license

//! Shuttle control loop.
//!
//! The locomotive shuttles between two sensor pairs:
//!
//! ```text
//!   S1 ---- S2 ==================== S3 ---- S4
//!   stop    slow down     full      slow down  stop
//! ```
//!
//! [`ShuttleStateMachine::tick`] samples the sensors, evaluates the
//! transition table for the current state and applies at most one
//! transition. A change of the REV switch resets the machine to
//! [`ShuttleState::Initial`] from anywhere, with the motor stopped and the
//! forward/backward mapping swapped.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::pwm::{self, Error as _};

use crate::common::{Logger, NoOpLogger};
use crate::config::ShuttleConfig;
use crate::gpio::{SensorBank, SensorSnapshot};
use crate::indicator::{RgbLed, StatusIndicator};
use crate::motor::{DriveChannel, MotorController, Speed};
use crate::registers::SharedStatus;
use crate::timer::{self, Clock, Duration, Instant};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ShuttleState {
    /// Waiting for the first sensor hit to learn where the train is.
    Initial = 0,
    /// Full speed towards S2.
    DrivingToS2 = 1,
    /// Reduced speed towards S1.
    DrivingToS1 = 2,
    StoppedInS1 = 3,
    /// Full speed towards S3.
    DrivingToS3 = 4,
    /// Reduced speed towards S4.
    DrivingToS4 = 5,
    StoppedInS4 = 6,
}

impl ShuttleState {
    pub const ALL: [ShuttleState; 7] = [
        ShuttleState::Initial,
        ShuttleState::DrivingToS2,
        ShuttleState::DrivingToS1,
        ShuttleState::StoppedInS1,
        ShuttleState::DrivingToS3,
        ShuttleState::DrivingToS4,
        ShuttleState::StoppedInS4,
    ];

    #[must_use]
    pub const fn is_driving(self) -> bool {
        matches!(
            self,
            ShuttleState::DrivingToS2
                | ShuttleState::DrivingToS1
                | ShuttleState::DrivingToS3
                | ShuttleState::DrivingToS4
        )
    }

    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ShuttleState::Initial),
            1 => Some(ShuttleState::DrivingToS2),
            2 => Some(ShuttleState::DrivingToS1),
            3 => Some(ShuttleState::StoppedInS1),
            4 => Some(ShuttleState::DrivingToS3),
            5 => Some(ShuttleState::DrivingToS4),
            6 => Some(ShuttleState::StoppedInS4),
            _ => None,
        }
    }
}

/// Failures that stop the control loop. None of them is retried.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Sensor(digital::ErrorKind),
    Motor(pwm::ErrorKind),
    Indicator,
}

/// Motor action attached to a transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MotorCommand {
    Forward(Speed),
    Backward(Speed),
    Stop,
}

/// Wait times in the two stopped states.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Dwell {
    pub at_s1: Duration,
    pub at_s4: Duration,
}

impl Dwell {
    #[must_use]
    pub fn from_config(config: &ShuttleConfig) -> Self {
        Self {
            at_s1: config.dwell_at_s1,
            at_s4: config.dwell_at_s4,
        }
    }
}

/// Transition table.
///
/// `elapsed` is the time spent in `state`. Conditions within a state are
/// checked in order and the first match wins, so simultaneous sensor hits
/// always resolve the same way.
#[must_use]
pub fn next_transition(
    state: ShuttleState,
    sensors: &SensorSnapshot,
    elapsed: Duration,
    dwell: &Dwell,
) -> Option<(MotorCommand, ShuttleState)> {
    use MotorCommand::{Backward, Forward, Stop};
    use ShuttleState::*;

    match state {
        Initial if sensors.s1 || sensors.s2 => Some((Forward(Speed::Full), DrivingToS3)),
        Initial if sensors.s3 || sensors.s4 => Some((Backward(Speed::Full), DrivingToS2)),
        DrivingToS2 if sensors.s2 => Some((Backward(Speed::Reduced), DrivingToS1)),
        DrivingToS2 if sensors.s1 => Some((Stop, StoppedInS1)),
        DrivingToS1 if sensors.s1 => Some((Stop, StoppedInS1)),
        StoppedInS1 if elapsed >= dwell.at_s1 => Some((Forward(Speed::Full), DrivingToS3)),
        DrivingToS3 if sensors.s3 => Some((Forward(Speed::Reduced), DrivingToS4)),
        DrivingToS3 if sensors.s4 => Some((Stop, StoppedInS4)),
        DrivingToS4 if sensors.s4 => Some((Stop, StoppedInS4)),
        StoppedInS4 if elapsed >= dwell.at_s4 => Some((Backward(Speed::Full), DrivingToS2)),
        _ => None,
    }
}

pub struct ShuttleStateMachine<'a, P, C, Led, L = NoOpLogger>
where
    P: InputPin,
    C: DriveChannel,
    Led: RgbLed,
    L: Logger,
{
    sensors: SensorBank<P>,
    motor: MotorController<C>,
    indicator: StatusIndicator<Led>,
    status: &'a SharedStatus,
    logger: L,
    state: ShuttleState,
    last_change: Instant,
    rev_active: bool,
    dwell: Dwell,
    tick_interval: Duration,
}

impl<'a, P, C, Led, L> ShuttleStateMachine<'a, P, C, Led, L>
where
    P: InputPin,
    C: DriveChannel,
    Led: RgbLed,
    L: Logger,
{
    pub fn new(
        sensors: SensorBank<P>,
        motor: MotorController<C>,
        indicator: StatusIndicator<Led>,
        status: &'a SharedStatus,
        config: &ShuttleConfig,
        logger: L,
    ) -> Self {
        Self {
            sensors,
            motor,
            indicator,
            status,
            logger,
            state: ShuttleState::Initial,
            last_change: Instant::from_ticks(0),
            rev_active: false,
            dwell: Dwell::from_config(config),
            tick_interval: config.tick_interval,
        }
    }

    /// Stop the motor and enter [`ShuttleState::Initial`].
    ///
    /// # Errors
    ///
    /// Motor or indicator failure.
    pub fn start(&mut self, now: Instant) -> Result<(), Error> {
        self.logger.info(format_args!("shuttle starting"));
        self.motor.stop().map_err(motor_error)?;
        self.change_state(ShuttleState::Initial, now)
    }

    /// One pass of the control loop.
    ///
    /// Returns the state entered, if any.
    ///
    /// # Errors
    ///
    /// Sensor, motor or indicator failure. The caller must not keep
    /// ticking after an error.
    pub fn tick(&mut self, now: Instant) -> Result<Option<ShuttleState>, Error> {
        let snapshot = self.sensors.read().map_err(Error::Sensor)?;

        let entered = if snapshot.rev != self.rev_active {
            self.logger.info(format_args!(
                "REV switch {} while {:?}, resetting",
                if snapshot.rev { "on" } else { "off" },
                self.state
            ));
            self.motor.stop().map_err(motor_error)?;
            self.motor.set_reversed(snapshot.rev);
            self.rev_active = snapshot.rev;
            self.change_state(ShuttleState::Initial, now)?;
            Some(ShuttleState::Initial)
        } else {
            let elapsed = timer::elapsed(self.last_change, now);
            match next_transition(self.state, &snapshot, elapsed, &self.dwell) {
                Some((command, next)) => {
                    self.apply(command)?;
                    self.change_state(next, now)?;
                    Some(next)
                }
                None => None,
            }
        };

        self.status
            .publish(snapshot.bitmap(self.state.is_driving()), self.state);
        Ok(entered)
    }

    /// Tick forever at the configured interval.
    ///
    /// # Errors
    ///
    /// Only returns, with the failure, when a tick fails.
    pub fn run<K: Clock, D: DelayNs>(
        &mut self,
        clock: &K,
        delay: &mut D,
    ) -> Result<Infallible, Error> {
        self.start(clock.now())?;
        let pause_ms = timer::as_delay_ms(self.tick_interval);
        loop {
            if let Err(e) = self.tick(clock.now()) {
                self.logger
                    .error(format_args!("control loop halted in {:?}: {:?}", self.state, e));
                return Err(e);
            }
            delay.delay_ms(pause_ms);
        }
    }

    #[must_use]
    pub fn state(&self) -> ShuttleState {
        self.state
    }

    /// When the current state was entered.
    #[must_use]
    pub fn last_change(&self) -> Instant {
        self.last_change
    }

    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.rev_active
    }

    #[must_use]
    pub fn dwell(&self) -> Dwell {
        self.dwell
    }

    pub fn free(self) -> (SensorBank<P>, MotorController<C>, StatusIndicator<Led>) {
        (self.sensors, self.motor, self.indicator)
    }

    fn apply(&mut self, command: MotorCommand) -> Result<(), Error> {
        match command {
            MotorCommand::Forward(speed) => self.motor.drive_forward(speed),
            MotorCommand::Backward(speed) => self.motor.drive_backward(speed),
            MotorCommand::Stop => self.motor.stop(),
        }
        .map_err(motor_error)
    }

    fn change_state(&mut self, next: ShuttleState, now: Instant) -> Result<(), Error> {
        self.logger
            .info(format_args!("{:?} -> {:?}", self.state, next));
        self.state = next;
        self.last_change = now;
        if let Err(e) = self.indicator.set(next) {
            self.logger
                .error(format_args!("status LED write failed: {:?}", e));
            return Err(Error::Indicator);
        }
        Ok(())
    }
}

fn motor_error<E: pwm::Error>(e: E) -> Error {
    Error::Motor(e.kind())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DWELL: Dwell = Dwell {
        at_s1: Duration::secs(5),
        at_s4: Duration::secs(10),
    };

    fn snapshot(bits: u8) -> SensorSnapshot {
        SensorSnapshot {
            s1: bits & 0b0001 != 0,
            s2: bits & 0b0010 != 0,
            s3: bits & 0b0100 != 0,
            s4: bits & 0b1000 != 0,
            rev: false,
        }
    }

    /// The table restated case by case, in priority order.
    fn expected(
        state: ShuttleState,
        s: &SensorSnapshot,
        elapsed: Duration,
    ) -> Option<(MotorCommand, ShuttleState)> {
        use MotorCommand::*;
        use ShuttleState::*;
        match state {
            Initial => {
                if s.s1 || s.s2 {
                    Some((Forward(Speed::Full), DrivingToS3))
                } else if s.s3 || s.s4 {
                    Some((Backward(Speed::Full), DrivingToS2))
                } else {
                    None
                }
            }
            DrivingToS2 => {
                if s.s2 {
                    Some((Backward(Speed::Reduced), DrivingToS1))
                } else if s.s1 {
                    Some((Stop, StoppedInS1))
                } else {
                    None
                }
            }
            DrivingToS1 => s.s1.then_some((Stop, StoppedInS1)),
            StoppedInS1 => (elapsed >= DWELL.at_s1).then_some((Forward(Speed::Full), DrivingToS3)),
            DrivingToS3 => {
                if s.s3 {
                    Some((Forward(Speed::Reduced), DrivingToS4))
                } else if s.s4 {
                    Some((Stop, StoppedInS4))
                } else {
                    None
                }
            }
            DrivingToS4 => s.s4.then_some((Stop, StoppedInS4)),
            StoppedInS4 => (elapsed >= DWELL.at_s4).then_some((Backward(Speed::Full), DrivingToS2)),
        }
    }

    #[test]
    fn test_table_matches_for_all_states_and_inputs() {
        let elapsed_values = [
            Duration::millis(0),
            Duration::millis(4_999),
            Duration::millis(5_000),
            Duration::millis(9_999),
            Duration::millis(10_000),
            Duration::secs(3_600),
        ];
        for state in ShuttleState::ALL {
            for bits in 0..16u8 {
                let s = snapshot(bits);
                for elapsed in elapsed_values {
                    assert_eq!(
                        next_transition(state, &s, elapsed, &DWELL),
                        expected(state, &s, elapsed),
                        "{state:?} sensors={bits:04b} elapsed={elapsed:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_simultaneous_sensors_resolve_by_priority() {
        let all = snapshot(0b1111);
        assert_eq!(
            next_transition(ShuttleState::Initial, &all, Duration::millis(0), &DWELL),
            Some((MotorCommand::Forward(Speed::Full), ShuttleState::DrivingToS3))
        );
        assert_eq!(
            next_transition(ShuttleState::DrivingToS2, &all, Duration::millis(0), &DWELL),
            Some((MotorCommand::Backward(Speed::Reduced), ShuttleState::DrivingToS1))
        );
        assert_eq!(
            next_transition(ShuttleState::DrivingToS3, &all, Duration::millis(0), &DWELL),
            Some((MotorCommand::Forward(Speed::Reduced), ShuttleState::DrivingToS4))
        );
    }

    #[test]
    fn test_stopped_states_ignore_sensors() {
        let all = snapshot(0b1111);
        assert_eq!(
            next_transition(ShuttleState::StoppedInS1, &all, Duration::millis(4_999), &DWELL),
            None
        );
        assert_eq!(
            next_transition(ShuttleState::StoppedInS4, &all, Duration::millis(9_999), &DWELL),
            None
        );
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in ShuttleState::ALL {
            assert_eq!(ShuttleState::from_u8(state as u8), Some(state));
        }
        assert_eq!(ShuttleState::from_u8(7), None);
    }

    #[test]
    fn test_driving_states() {
        let driving: Vec<_> = ShuttleState::ALL
            .into_iter()
            .filter(|s| s.is_driving())
            .collect();
        assert_eq!(
            driving,
            vec![
                ShuttleState::DrivingToS2,
                ShuttleState::DrivingToS1,
                ShuttleState::DrivingToS3,
                ShuttleState::DrivingToS4
            ]
        );
    }
}
