// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::{fmt, ops, time::Duration};

/// An absolute point in time, measured in microseconds from the epoch of the
/// [`Clock`](crate::time::Clock) that produced it.
///
/// Timestamps from different clocks are not comparable.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.as_duration();
        let micros = duration.subsec_micros();
        let secs = duration.as_secs();
        write!(f, "{secs}.{micros:06}s")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Timestamp {
    /// The latest representable timestamp
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a timestamp `duration` after the clock epoch
    ///
    /// Durations beyond the microsecond range saturate to [`Self::MAX`].
    #[inline]
    pub const fn from_duration(duration: Duration) -> Self {
        let micros = duration.as_micros();
        if micros > u64::MAX as u128 {
            Self::MAX
        } else {
            Self(micros as u64)
        }
    }

    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Returns the time elapsed between the clock epoch and this timestamp
    #[inline]
    pub const fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }

    #[inline]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Returns true if this timestamp is at or before `current_time`
    #[inline]
    pub fn has_elapsed(self, current_time: Self) -> bool {
        self <= current_time
    }

    /// Returns the time elapsed since `earlier`, or zero if `earlier` is later
    #[inline]
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    #[inline]
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        let micros = u64::try_from(duration.as_micros()).ok()?;
        self.0.checked_add(micros).map(Self)
    }

    #[inline]
    pub fn checked_sub(self, duration: Duration) -> Option<Self> {
        let micros = u64::try_from(duration.as_micros()).ok()?;
        self.0.checked_sub(micros).map(Self)
    }
}

impl ops::Add<Duration> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }
}

impl ops::AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl ops::Sub<Duration> for Timestamp {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        self.checked_sub(rhs).unwrap_or_default()
    }
}

impl ops::Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let mut ts = Timestamp::from_duration(Duration::from_millis(10));
        assert_eq!(ts.as_micros(), 10_000);

        ts += Duration::from_micros(5);
        assert_eq!(ts - Timestamp::from_micros(5), Duration::from_micros(10_000));
        assert_eq!(ts - Duration::from_micros(10_005), Timestamp::default());
        assert_eq!(Timestamp::default() - ts, Duration::ZERO);
        assert_eq!(ts - Duration::from_secs(1), Timestamp::default());
    }

    #[test]
    fn saturation() {
        assert_eq!(Timestamp::MAX + Duration::from_micros(1), Timestamp::MAX);
        assert_eq!(Timestamp::from_duration(Duration::MAX), Timestamp::MAX);
        assert_eq!(Timestamp::MAX.checked_add(Duration::from_micros(1)), None);
    }

    #[test]
    fn has_elapsed() {
        let ts = Timestamp::from_micros(100);
        assert!(!ts.has_elapsed(Timestamp::from_micros(99)));
        assert!(ts.has_elapsed(Timestamp::from_micros(100)));
        assert!(ts.has_elapsed(Timestamp::from_micros(101)));
    }

    #[test]
    fn debug_format() {
        let ts = Timestamp::from_duration(Duration::from_micros(1_000_123));
        assert_eq!(format!("{ts:?}"), "1.000123s");
    }
}
