// Licensed under the Apache-2.0 license

//! Logging shared by the control loop and the bus tasks.
//!
//! Components take a `Logger` type parameter that defaults to [`NoOpLogger`],
//! so a board that has nowhere to send text pays nothing for it.

use core::fmt;

/// Severity of a log line, ordered from most to least verbose.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Sink for diagnostic text.
///
/// Only [`Logger::log`] is required; the level helpers forward to it.
pub trait Logger {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>);

    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn info(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warn(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

/// Discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Writes `[LEVEL] message\r\n` lines to a byte sink such as a debug UART.
///
/// Write failures are dropped: a broken log port must never stop the motor
/// loop or the bus handler.
pub struct UartLogger<W: embedded_io::Write> {
    writer: W,
    min_level: Level,
}

impl<W: embedded_io::Write> UartLogger<W> {
    pub fn new(writer: W, min_level: Level) -> Self {
        Self { writer, min_level }
    }

    pub fn set_min_level(&mut self, level: Level) {
        self.min_level = level;
    }

    pub fn free(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> Logger for UartLogger<W> {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        if level < self.min_level {
            return;
        }
        let _ = write!(self.writer, "[{}] ", level.tag());
        let _ = self.writer.write_fmt(args);
        let _ = self.writer.write_all(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Capture(Vec<u8>);

    impl embedded_io::ErrorType for Capture {
        type Error = core::convert::Infallible;
    }

    impl embedded_io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_uart_logger_formats_lines() {
        let mut logger = UartLogger::new(Capture(Vec::new()), Level::Debug);
        logger.info(format_args!("listening on 0x{:02x}", 0x28));
        logger.error(format_args!("bus fault"));

        let text = String::from_utf8(logger.free().0).unwrap();
        assert_eq!(text, "[INFO] listening on 0x28\r\n[ERROR] bus fault\r\n");
    }

    #[test]
    fn test_uart_logger_filters_below_min_level() {
        let mut logger = UartLogger::new(Capture(Vec::new()), Level::Warn);
        logger.debug(format_args!("tick"));
        logger.info(format_args!("transition"));
        logger.warn(format_args!("queue full"));

        let text = String::from_utf8(logger.free().0).unwrap();
        assert_eq!(text, "[WARN] queue full\r\n");
    }
}
