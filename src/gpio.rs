// Licensed under the Apache-2.0 license

//! Boundary sensors and the direction-reversal switch.
//!
//! All five inputs are wired active-low: a line pulled to ground means the
//! sensor (or the REV switch) is active. [`SensorBank`] inverts the raw level
//! and optionally requires a number of consecutive equal samples before an
//! input is allowed to change.

use embedded_hal::digital::{Error as _, ErrorKind, InputPin};

pub const BIT_REV: u8 = 1 << 0;
pub const BIT_S1: u8 = 1 << 1;
pub const BIT_S2: u8 = 1 << 2;
pub const BIT_S3: u8 = 1 << 3;
pub const BIT_S4: u8 = 1 << 4;
/// Set while the locomotive is being driven.
pub const BIT_DRIVING: u8 = 1 << 5;

/// Number of meaningful bits in the published sensor bitmap.
pub const SENSOR_BIT_COUNT: u8 = 6;

/// Logical state of every input at one instant.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    pub s1: bool,
    pub s2: bool,
    pub s3: bool,
    pub s4: bool,
    pub rev: bool,
}

impl SensorSnapshot {
    /// Pack the snapshot into the register-0x10 layout.
    #[must_use]
    pub const fn bitmap(self, driving: bool) -> u8 {
        let mut bits = 0;
        if self.rev {
            bits |= BIT_REV;
        }
        if self.s1 {
            bits |= BIT_S1;
        }
        if self.s2 {
            bits |= BIT_S2;
        }
        if self.s3 {
            bits |= BIT_S3;
        }
        if self.s4 {
            bits |= BIT_S4;
        }
        if driving {
            bits |= BIT_DRIVING;
        }
        bits
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Debounced {
    stable: bool,
    pending: u8,
}

impl Debounced {
    fn update(&mut self, raw: bool, threshold: u8) -> bool {
        if raw == self.stable {
            self.pending = 0;
        } else {
            self.pending = self.pending.saturating_add(1);
            if self.pending >= threshold {
                self.stable = raw;
                self.pending = 0;
            }
        }
        self.stable
    }
}

/// Four position sensors (S1..S4) and the REV switch.
pub struct SensorBank<P: InputPin> {
    positions: [P; 4],
    rev: P,
    filters: [Debounced; 5],
    debounce_samples: u8,
}

impl<P: InputPin> SensorBank<P> {
    /// `debounce_samples` of 1 passes every sample straight through.
    pub fn new(s1: P, s2: P, s3: P, s4: P, rev: P, debounce_samples: u8) -> Self {
        Self {
            positions: [s1, s2, s3, s4],
            rev,
            filters: [Debounced::default(); 5],
            debounce_samples: debounce_samples.max(1),
        }
    }

    /// Sample all five inputs once.
    ///
    /// # Errors
    ///
    /// Returns the kind of the first pin read that failed.
    pub fn read(&mut self) -> Result<SensorSnapshot, ErrorKind> {
        let threshold = self.debounce_samples;
        let (position_filters, rev_filter) = self.filters.split_at_mut(4);

        let mut active = [false; 4];
        for ((pin, filter), slot) in self
            .positions
            .iter_mut()
            .zip(position_filters.iter_mut())
            .zip(active.iter_mut())
        {
            let raw = pin.is_low().map_err(|e| e.kind())?;
            *slot = filter.update(raw, threshold);
        }

        let raw_rev = self.rev.is_low().map_err(|e| e.kind())?;
        let rev = rev_filter
            .first_mut()
            .map_or(raw_rev, |filter| filter.update(raw_rev, threshold));

        let [s1, s2, s3, s4] = active;
        Ok(SensorSnapshot { s1, s2, s3, s4, rev })
    }

    pub fn free(self) -> ([P; 4], P) {
        (self.positions, self.rev)
    }
}
