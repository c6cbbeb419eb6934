// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Test helpers shared with dependent crates via the `testing` feature

use crate::time::{self, Duration, Timestamp};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// A manually advanced clock
///
/// Clones share the same time, so a clone handed to a component under test can
/// be advanced from the test body, including from other threads.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    micros: Arc<AtomicU64>,
}

impl Clock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(start.as_micros())),
        }
    }

    pub fn inc_by(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.micros.store(timestamp.as_micros(), Ordering::Relaxed);
    }
}

impl time::Clock for Clock {
    fn get_time(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Clock as _;

    #[test]
    fn clones_share_time() {
        let clock = Clock::new(Timestamp::from_micros(10));
        let other = clock.clone();

        other.inc_by(Duration::from_micros(5));
        assert_eq!(clock.get_time(), Timestamp::from_micros(15));

        clock.set(Timestamp::from_micros(1));
        assert_eq!(other.get_time(), Timestamp::from_micros(1));
    }
}
