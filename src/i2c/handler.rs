// Licensed under the Apache-2.0 license

//! Bus event handler task.
//!
//! Drains the listener's queue and applies each event to the register
//! table:
//!
//! | Event | Payload | Effect |
//! |-------|---------|--------|
//! | Receive | `[]` | none |
//! | Receive | `[addr]` | select `addr` for the next read |
//! | Receive | `[value]` after `[addr]` | write `value` to `addr` |
//! | Receive | `[addr, value, ..]` | select `addr`, write `value` |
//! | Request | | reply one byte from the selected register, `0x00` if none |
//! | Finish | | end the transaction, the selection is kept |
//!
//! Peripherals that hand over one byte per `Receive` deliver a write as two
//! events inside one transaction; the second byte is the value.
//!
//! Nothing a controller sends can stop the handler: bad addresses are
//! logged and normalized.

use heapless::spsc::Consumer;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{IncomingEvent, TargetEvent};
use crate::i2c::traits::I2cTargetReply;
use crate::outputs::OutputSink;
use crate::registers::{RegisterError, RegisterTable};

/// Reply for reads that hit no readable register.
pub const UNMAPPED_READ_VALUE: u8 = 0x00;

pub struct TargetHandler<'q, 'a, R, O, const N: usize, L = NoOpLogger>
where
    R: I2cTargetReply,
    O: OutputSink,
    L: Logger,
{
    queue: Consumer<'q, IncomingEvent, N>,
    responder: R,
    registers: RegisterTable<'a, O>,
    selected: Option<u8>,
    /// Address received alone in the open transaction, waiting for a value.
    pending: Option<u8>,
    logger: L,
}

impl<'q, 'a, R, O, const N: usize, L> TargetHandler<'q, 'a, R, O, N, L>
where
    R: I2cTargetReply,
    O: OutputSink,
    L: Logger,
{
    pub fn new(
        queue: Consumer<'q, IncomingEvent, N>,
        responder: R,
        registers: RegisterTable<'a, O>,
        logger: L,
    ) -> Self {
        Self {
            queue,
            responder,
            registers,
            selected: None,
            pending: None,
            logger,
        }
    }

    /// Handle the next queued event.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while the queue is empty; `Other` if a reply could not
    /// be handed to the peripheral.
    pub fn poll(&mut self) -> nb::Result<TargetEvent, R::Error> {
        let incoming = self.queue.dequeue().ok_or(nb::Error::WouldBlock)?;
        self.handle(&incoming).map_err(nb::Error::Other)?;
        Ok(incoming.event)
    }

    /// Serve events forever, spinning while the queue is empty.
    pub fn run(&mut self) -> ! {
        loop {
            match self.poll() {
                Ok(_) | Err(nb::Error::Other(_)) => {}
                Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
            }
        }
    }

    /// # Errors
    ///
    /// Only a failed reply is an error; register problems are logged.
    pub fn handle(&mut self, incoming: &IncomingEvent) -> Result<(), R::Error> {
        match incoming.event {
            TargetEvent::Receive => {
                self.receive(incoming);
                Ok(())
            }
            TargetEvent::Request => {
                self.pending = None;
                self.request()
            }
            TargetEvent::Finish => {
                self.pending = None;
                Ok(())
            }
        }
    }

    /// Register address the next read will come from.
    #[must_use]
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    #[must_use]
    pub fn registers(&self) -> &RegisterTable<'a, O> {
        &self.registers
    }

    pub fn free(self) -> (Consumer<'q, IncomingEvent, N>, R, RegisterTable<'a, O>) {
        (self.queue, self.responder, self.registers)
    }

    fn receive(&mut self, incoming: &IncomingEvent) {
        match (incoming.payload(), self.pending.take()) {
            (&[], pending) => self.pending = pending,
            (&[value], Some(address)) => self.write(address, value),
            (&[address], None) => {
                self.selected = Some(address);
                self.pending = Some(address);
            }
            (&[address, value, ..], _) => {
                self.selected = Some(address);
                self.write(address, value);
            }
        }
        let excess = incoming.excess();
        if let (true, [address, ..]) = (excess > 0, incoming.payload()) {
            self.logger.warn(format_args!(
                "ignoring {} trailing bytes of write to 0x{:02x}",
                excess, address
            ));
        }
    }

    fn write(&mut self, address: u8, value: u8) {
        match self.registers.write(address, value) {
            Ok(()) => self
                .logger
                .debug(format_args!("reg 0x{:02x} <- 0x{:02x}", address, value)),
            Err(RegisterError::Unmapped(_)) => self.logger.warn(format_args!(
                "write to unknown register 0x{:02x} (0x{:02x}) ignored",
                address, value
            )),
            Err(RegisterError::ReadOnly(_)) => self.logger.warn(format_args!(
                "write to read-only register 0x{:02x} (0x{:02x}) ignored",
                address, value
            )),
            Err(RegisterError::Output(e)) => self.logger.error(format_args!(
                "output for register 0x{:02x} failed: {:?}",
                address, e
            )),
        }
    }

    fn request(&mut self) -> Result<(), R::Error> {
        let value = match self.selected {
            Some(address) => self.registers.read(address).unwrap_or_else(|| {
                self.logger
                    .warn(format_args!("read of unknown register 0x{:02x}", address));
                UNMAPPED_READ_VALUE
            }),
            None => {
                self.logger.warn(format_args!("read with no register selected"));
                UNMAPPED_READ_VALUE
            }
        };
        self.responder.reply(&[value]).inspect_err(|e| {
            self.logger.error(format_args!("reply failed: {:?}", e));
        })
    }
}
