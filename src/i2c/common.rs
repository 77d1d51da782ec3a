// Licensed under the Apache-2.0 license

//! Types shared by the bus listener and the event handler.

/// Bytes of a write that carry meaning: register address, then value.
pub const MAX_PAYLOAD: usize = 2;

/// Phase of a target-mode transaction as seen by the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TargetEvent {
    /// The controller wrote bytes to us.
    Receive,
    /// The controller is reading; a reply is owed before the bus times out.
    Request,
    /// Stop condition, the transaction is over.
    Finish,
}

/// One bus event as queued from the listener to the handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IncomingEvent {
    pub event: TargetEvent,
    /// Bytes the controller sent, which may exceed what was kept.
    pub len: usize,
    pub data: [u8; MAX_PAYLOAD],
}

impl IncomingEvent {
    /// `received` holds the leading bytes of a `len`-byte write.
    #[must_use]
    pub fn new(event: TargetEvent, received: &[u8], len: usize) -> Self {
        let mut data = [0; MAX_PAYLOAD];
        for (slot, byte) in data.iter_mut().zip(received.iter().take(len)) {
            *slot = *byte;
        }
        Self { event, len, data }
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let kept = self.len.min(MAX_PAYLOAD);
        self.data.get(..kept).unwrap_or(&[])
    }

    /// Bytes past the register address and value.
    #[must_use]
    pub fn excess(&self) -> usize {
        self.len.saturating_sub(MAX_PAYLOAD)
    }
}

/// Why a listen cycle ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListenError<E> {
    Configure(E),
    Listen(E),
    Wait(E),
}
