// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::time::timestamp::Timestamp;
use std::{sync::Arc, time::Instant};

/// A `Clock` is a source of [`Timestamp`]s.
pub trait Clock {
    /// Returns the current [`Timestamp`]
    fn get_time(&self) -> Timestamp;
}

impl Clock for Timestamp {
    #[inline]
    fn get_time(&self) -> Timestamp {
        *self
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn get_time(&self) -> Timestamp {
        (**self).get_time()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn get_time(&self) -> Timestamp {
        (**self).get_time()
    }
}

/// A monotonic clock measuring time since its creation
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    epoch: Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl StdClock {
    /// Creates a new `StdClock` with the given epoch
    pub const fn new(epoch: Instant) -> Self {
        Self { epoch }
    }

    /// Returns the [`Timestamp`] corresponding to `instant`
    ///
    /// Instants before the epoch map to the epoch.
    #[inline]
    pub fn timestamp(&self, instant: Instant) -> Timestamp {
        Timestamp::from_duration(instant.saturating_duration_since(self.epoch))
    }
}

impl Clock for StdClock {
    #[inline]
    fn get_time(&self) -> Timestamp {
        Timestamp::from_duration(self.epoch.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    #[cfg_attr(miri, ignore)] // time isn't queryable in miri
    fn monotonicity_test() {
        let clock = StdClock::default();
        let ts1 = clock.get_time();
        std::thread::sleep(Duration::from_millis(50));
        let ts2 = clock.get_time();
        assert!(ts2 - ts1 >= Duration::from_millis(50));
    }

    #[test]
    fn instant_before_epoch() {
        let before = Instant::now();
        let clock = StdClock::new(before + Duration::from_secs(1));
        assert_eq!(clock.timestamp(before), Timestamp::default());
    }
}
