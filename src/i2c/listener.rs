// Licensed under the Apache-2.0 license

//! Bus listener task.
//!
//! Owns the blocking side of the target peripheral. It does no decoding:
//! every event is copied into the queue and the listener goes straight back
//! to waiting, so a slow handler can never hold up the bus.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use heapless::spsc::Producer;

use crate::common::{Logger, NoOpLogger};
use crate::config::ShuttleConfig;
use crate::i2c::common::{IncomingEvent, ListenError, MAX_PAYLOAD};
use crate::i2c::traits::I2cTargetEventSync;
use crate::timer::{self, Duration};

pub struct BusListener<'q, T, D, const N: usize, L = NoOpLogger>
where
    T: I2cTargetEventSync,
    D: DelayNs,
    L: Logger,
{
    target: T,
    delay: D,
    queue: Producer<'q, IncomingEvent, N>,
    address: u8,
    backoff: Duration,
    dropped: u32,
    logger: L,
}

impl<'q, T, D, const N: usize, L> BusListener<'q, T, D, N, L>
where
    T: I2cTargetEventSync,
    D: DelayNs,
    L: Logger,
{
    pub fn new(
        target: T,
        delay: D,
        queue: Producer<'q, IncomingEvent, N>,
        config: &ShuttleConfig,
        logger: L,
    ) -> Self {
        Self {
            target,
            delay,
            queue,
            address: config.i2c_address,
            backoff: config.bus_retry_backoff,
            dropped: 0,
            logger,
        }
    }

    /// One listen cycle: configure, listen, then forward events.
    ///
    /// # Errors
    ///
    /// Returns only when the peripheral fails; the error names the step.
    pub fn listen(&mut self) -> Result<Infallible, ListenError<T::Error>> {
        self.target.configure().map_err(ListenError::Configure)?;
        self.target.listen(self.address).map_err(ListenError::Listen)?;
        self.logger
            .info(format_args!("listening as target 0x{:02x}", self.address));

        let mut buffer = [0u8; MAX_PAYLOAD];
        loop {
            let (event, len) = self
                .target
                .wait_for_event(&mut buffer)
                .map_err(ListenError::Wait)?;
            self.forward(IncomingEvent::new(event, &buffer, len));
        }
    }

    /// Log a failed cycle and wait out the retry backoff.
    pub fn recover(&mut self, error: &ListenError<T::Error>) {
        self.logger.error(format_args!(
            "I2C listener failed: {:?}, retrying in {} ms",
            error,
            self.backoff.to_millis()
        ));
        self.delay.delay_ms(timer::as_delay_ms(self.backoff));
    }

    /// Listen, recover, repeat.
    pub fn serve_forever(&mut self) -> ! {
        loop {
            match self.listen() {
                Ok(never) => match never {},
                Err(e) => self.recover(&e),
            }
        }
    }

    /// Events lost because the queue was full.
    #[must_use]
    pub fn dropped_events(&self) -> u32 {
        self.dropped
    }

    pub fn free(self) -> (T, D, Producer<'q, IncomingEvent, N>) {
        (self.target, self.delay, self.queue)
    }

    fn forward(&mut self, incoming: IncomingEvent) {
        if let Err(lost) = self.queue.enqueue(incoming) {
            self.dropped = self.dropped.saturating_add(1);
            self.logger.warn(format_args!(
                "event queue full, dropped {:?} ({} total)",
                lost.event, self.dropped
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Level;
    use crate::i2c::common::TargetEvent;
    use crate::tests::mocks::{BusStep, MockTargetBus, RecordingDelay, RecordingLogger};
    use embedded_hal::i2c::ErrorKind;
    use heapless::spsc::Queue;

    #[test]
    fn test_events_are_forwarded_in_order() {
        let bus = MockTargetBus::new(vec![
            BusStep::event(TargetEvent::Receive, &[0x10]),
            BusStep::event(TargetEvent::Finish, &[]),
            BusStep::event(TargetEvent::Request, &[]),
            BusStep::event(TargetEvent::Receive, &[0x30, 0x7F, 0x01]),
        ]);
        let mut queue: Queue<IncomingEvent, 8> = Queue::new();
        let (producer, mut consumer) = queue.split();
        let config = ShuttleConfig::default();
        let mut listener = BusListener::new(
            bus.clone(),
            RecordingDelay::new(),
            producer,
            &config,
            NoOpLogger,
        );

        // The script ends with a bus error, which ends the cycle.
        assert!(matches!(listener.listen(), Err(ListenError::Wait(_))));
        assert_eq!(bus.listening_address(), Some(0x28));

        let events: Vec<_> = core::iter::from_fn(|| consumer.dequeue()).collect();
        assert_eq!(
            events,
            vec![
                IncomingEvent::new(TargetEvent::Receive, &[0x10], 1),
                IncomingEvent::new(TargetEvent::Finish, &[], 0),
                IncomingEvent::new(TargetEvent::Request, &[], 0),
                IncomingEvent::new(TargetEvent::Receive, &[0x30, 0x7F], 3),
            ]
        );
        assert_eq!(listener.dropped_events(), 0);
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let bus = MockTargetBus::new(vec![
            BusStep::event(TargetEvent::Receive, &[0x20, 0x01]),
            BusStep::event(TargetEvent::Finish, &[]),
            BusStep::event(TargetEvent::Receive, &[0x20, 0x02]),
            BusStep::event(TargetEvent::Finish, &[]),
        ]);
        // Capacity is N - 1.
        let mut queue: Queue<IncomingEvent, 3> = Queue::new();
        let (producer, _consumer) = queue.split();
        let logger = RecordingLogger::new();
        let config = ShuttleConfig::default();
        let mut listener = BusListener::new(
            bus,
            RecordingDelay::new(),
            producer,
            &config,
            logger.clone(),
        );

        let _ = listener.listen();
        assert_eq!(listener.dropped_events(), 2);
        assert_eq!(logger.count(Level::Warn), 2);
    }

    #[test]
    fn test_failed_configure_backs_off() {
        let bus = MockTargetBus::new(vec![]);
        bus.fail_configure(ErrorKind::Bus);
        let delay = RecordingDelay::new();
        let logger = RecordingLogger::new();
        let mut queue: Queue<IncomingEvent, 4> = Queue::new();
        let (producer, _consumer) = queue.split();
        let config = ShuttleConfig::default();
        let mut listener = BusListener::new(
            bus.clone(),
            delay.clone(),
            producer,
            &config,
            logger.clone(),
        );

        let error = match listener.listen() {
            Ok(never) => match never {},
            Err(e) => e,
        };
        assert!(matches!(error, ListenError::Configure(_)));
        assert_eq!(bus.listening_address(), None);

        listener.recover(&error);
        assert_eq!(delay.delays_ms(), vec![1_000]);
        assert!(logger.contains(Level::Error, "retrying in 1000 ms"));
    }

    #[test]
    fn test_relisten_after_wait_failure() {
        let bus = MockTargetBus::new(vec![
            BusStep::event(TargetEvent::Receive, &[0x10]),
            BusStep::fail(ErrorKind::ArbitrationLoss),
            BusStep::event(TargetEvent::Request, &[]),
        ]);
        let mut queue: Queue<IncomingEvent, 8> = Queue::new();
        let (producer, mut consumer) = queue.split();
        let config = ShuttleConfig::default();
        let mut listener = BusListener::new(
            bus.clone(),
            RecordingDelay::new(),
            producer,
            &config,
            NoOpLogger,
        );

        assert!(matches!(listener.listen(), Err(ListenError::Wait(_))));
        assert!(matches!(listener.listen(), Err(ListenError::Wait(_))));
        assert_eq!(bus.configure_count(), 2);

        assert_eq!(consumer.dequeue().map(|e| e.event), Some(TargetEvent::Receive));
        assert_eq!(consumer.dequeue().map(|e| e.event), Some(TargetEvent::Request));
        assert_eq!(consumer.dequeue(), None);
    }
}
