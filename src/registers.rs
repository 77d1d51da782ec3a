// Licensed under the Apache-2.0 license

//! Register map exposed to the bus master.
//!
//! | Addr | Access | Contents |
//! |------|--------|----------|
//! | `0x00..=0x02` | R | firmware version major/minor/patch |
//! | `0x03` | R | number of sensor bits in `0x10` |
//! | `0x04` | R | number of expander output bits |
//! | `0x10` | R | live sensor bitmap, see [`crate::gpio`] |
//! | `0x20` | W | local output bitmap |
//! | `0x21..=0x28` | W | output bitmap of expander 0..7 |
//! | `0x30..=0x37` | W | PWM duty of local output 0..7 |
//!
//! Every register is one byte wide. Readable registers are written only by
//! the control loop, writable ones only by the bus handler, so the single
//! cell both sides touch is the atomic sensor bitmap in [`SharedStatus`].

use core::sync::atomic::{AtomicU8, Ordering};

use zerocopy::{Immutable, IntoBytes};

use crate::gpio::SENSOR_BIT_COUNT;
use crate::outputs::OutputSink;
use crate::shuttle::ShuttleState;

/// Values the control loop publishes for the bus side.
#[derive(Debug)]
pub struct SharedStatus {
    sensors: AtomicU8,
    state: AtomicU8,
}

impl SharedStatus {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sensors: AtomicU8::new(0),
            state: AtomicU8::new(ShuttleState::Initial as u8),
        }
    }

    pub fn publish(&self, sensor_bitmap: u8, state: ShuttleState) {
        self.sensors.store(sensor_bitmap, Ordering::Release);
        self.state.store(state as u8, Ordering::Release);
    }

    #[must_use]
    pub fn sensor_bitmap(&self) -> u8 {
        self.sensors.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> ShuttleState {
        ShuttleState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(ShuttleState::Initial)
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(IntoBytes, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

pub const FIRMWARE_VERSION: FirmwareVersion = FirmwareVersion {
    major: 0,
    minor: 1,
    patch: 0,
};

impl FirmwareVersion {
    /// Byte `index` of the version block, in register order.
    #[must_use]
    pub fn byte(&self, index: u8) -> Option<u8> {
        self.as_bytes().get(usize::from(index)).copied()
    }
}

/// Static facts about the fitted hardware.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub sensor_bits: u8,
    pub expander_count: u8,
}

impl DeviceInfo {
    #[must_use]
    pub const fn new(expander_count: u8) -> Self {
        Self {
            sensor_bits: SENSOR_BIT_COUNT,
            expander_count,
        }
    }

    #[must_use]
    pub const fn expander_output_bits(&self) -> u8 {
        self.expander_count.saturating_mul(8)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    Version(u8),
    SensorBits,
    ExpanderOutputBits,
    SensorState,
    LocalOutputs,
    ExpanderOutputs(u8),
    PwmDuty(u8),
}

impl Register {
    #[must_use]
    pub const fn from_address(address: u8) -> Option<Self> {
        match address {
            0x00..=0x02 => Some(Register::Version(address)),
            0x03 => Some(Register::SensorBits),
            0x04 => Some(Register::ExpanderOutputBits),
            0x10 => Some(Register::SensorState),
            0x20 => Some(Register::LocalOutputs),
            0x21..=0x28 => Some(Register::ExpanderOutputs(address - 0x21)),
            0x30..=0x37 => Some(Register::PwmDuty(address - 0x30)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn address(self) -> u8 {
        match self {
            Register::Version(i) => i,
            Register::SensorBits => 0x03,
            Register::ExpanderOutputBits => 0x04,
            Register::SensorState => 0x10,
            Register::LocalOutputs => 0x20,
            Register::ExpanderOutputs(n) => 0x21u8.wrapping_add(n),
            Register::PwmDuty(n) => 0x30u8.wrapping_add(n),
        }
    }

    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(
            self,
            Register::LocalOutputs | Register::ExpanderOutputs(_) | Register::PwmDuty(_)
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterError<E> {
    /// Nothing is mapped at this address.
    Unmapped(u8),
    /// Write to a read-only register.
    ReadOnly(u8),
    /// The output behind the register rejected the value.
    Output(E),
}

/// Read and write dispatch for the bus handler.
pub struct RegisterTable<'a, O: OutputSink> {
    status: &'a SharedStatus,
    version: FirmwareVersion,
    info: DeviceInfo,
    outputs: O,
}

impl<'a, O: OutputSink> RegisterTable<'a, O> {
    pub fn new(status: &'a SharedStatus, info: DeviceInfo, outputs: O) -> Self {
        Self {
            status,
            version: FIRMWARE_VERSION,
            info,
            outputs,
        }
    }

    /// Value of a readable register, or `None` if `address` has no read side.
    #[must_use]
    pub fn read(&self, address: u8) -> Option<u8> {
        match Register::from_address(address)? {
            Register::Version(i) => self.version.byte(i),
            Register::SensorBits => Some(self.info.sensor_bits),
            Register::ExpanderOutputBits => Some(self.info.expander_output_bits()),
            Register::SensorState => Some(self.status.sensor_bitmap()),
            Register::LocalOutputs | Register::ExpanderOutputs(_) | Register::PwmDuty(_) => None,
        }
    }

    /// # Errors
    ///
    /// [`RegisterError::Unmapped`] for addresses without a register or for
    /// expanders that are not fitted, [`RegisterError::ReadOnly`] for the
    /// status registers, and [`RegisterError::Output`] when the output
    /// itself fails.
    pub fn write(&mut self, address: u8, value: u8) -> Result<(), RegisterError<O::Error>> {
        let register = Register::from_address(address).ok_or(RegisterError::Unmapped(address))?;
        if !register.is_writable() {
            return Err(RegisterError::ReadOnly(address));
        }
        match register {
            Register::LocalOutputs => self.outputs.set_local_outputs(value),
            Register::ExpanderOutputs(device) if device < self.info.expander_count => {
                self.outputs.set_expander_outputs(device, value)
            }
            Register::PwmDuty(channel) => self.outputs.set_pwm_duty(channel, value),
            // Expanders that are not fitted.
            _ => return Err(RegisterError::Unmapped(address)),
        }
        .map_err(RegisterError::Output)
    }

    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        self.info
    }

    pub fn free(self) -> O {
        self.outputs
    }
}
