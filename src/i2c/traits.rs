// Licensed under the Apache-2.0 license

//! # I2C target-mode capabilities
//!
//! Small traits that a board's I2C peripheral implements so the listener
//! and handler never see the hardware.
//!
//! ```text
//! I2cTargetCore (configure, listen)
//!     └── I2cTargetEventSync (blocking wait for the next event)
//! I2cTargetReply (answer a read)
//! I2cTarget = I2cTargetEventSync + I2cTargetReply
//! ```
//!
//! The listener and the handler run on different tasks, so a board usually
//! hands the listener a value implementing [`I2cTargetEventSync`] and the
//! handler a separate handle implementing [`I2cTargetReply`] onto the same
//! peripheral.

use embedded_hal::i2c::{AddressMode, SevenBitAddress};

use crate::i2c::common::TargetEvent;

/// Address setup and mode control.
pub trait I2cTargetCore<A: AddressMode = SevenBitAddress> {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Put the peripheral into target mode with no address assigned.
    ///
    /// Called at the start of every listen cycle, so it must also bring a
    /// wedged peripheral back to a clean state.
    fn configure(&mut self) -> Result<(), Self::Error>;

    /// Start answering to `address`.
    fn listen(&mut self, address: A) -> Result<(), Self::Error>;
}

/// Blocking event delivery.
pub trait I2cTargetEventSync<A: AddressMode = SevenBitAddress>: I2cTargetCore<A> {
    /// Block until the next bus event.
    ///
    /// For [`TargetEvent::Receive`] the leading received bytes are copied
    /// into `buffer`. The returned count is the number of bytes the
    /// controller sent, which may be larger than `buffer`. Other events
    /// report a count of zero.
    fn wait_for_event(&mut self, buffer: &mut [u8]) -> Result<(TargetEvent, usize), Self::Error>;
}

/// Response path for controller reads.
pub trait I2cTargetReply {
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Queue `data` as the response to the pending read.
    fn reply(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// A peripheral handle that can both wait for events and reply.
pub trait I2cTarget<A: AddressMode = SevenBitAddress>: I2cTargetEventSync<A> + I2cTargetReply {}

impl<T, A> I2cTarget<A> for T
where
    A: AddressMode,
    T: I2cTargetEventSync<A> + I2cTargetReply,
{
}
