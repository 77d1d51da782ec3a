// Licensed under the Apache-2.0 license

//! Millisecond time base.

/// Point in time on a 1 kHz monotonic timer.
pub type Instant = fugit::TimerInstantU64<1000>;

/// Span of time on the same 1 kHz base as [`Instant`].
pub type Duration = fugit::MillisDurationU64;

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Time elapsed from `since` to `now`, saturating at zero if the timer
/// appears to have moved backwards.
#[must_use]
pub fn elapsed(since: Instant, now: Instant) -> Duration {
    now.checked_duration_since(since)
        .unwrap_or(Duration::from_ticks(0))
}

/// Duration as whole milliseconds for `DelayNs::delay_ms`.
#[must_use]
pub fn as_delay_ms(duration: Duration) -> u32 {
    u32::try_from(duration.to_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_saturates() {
        let early = Instant::from_ticks(1_000);
        let late = Instant::from_ticks(6_000);
        assert_eq!(elapsed(early, late), Duration::millis(5_000));
        assert_eq!(elapsed(late, early), Duration::millis(0));
    }

    #[test]
    fn test_delay_ms_clamps() {
        assert_eq!(as_delay_ms(Duration::secs(1)), 1_000);
        assert_eq!(as_delay_ms(Duration::from_ticks(u64::MAX)), u32::MAX);
    }
}
