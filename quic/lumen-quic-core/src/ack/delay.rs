// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Coalesces "acknowledge soon" requests into a single pending deadline

use crate::time::{Clock, Duration, StdClock, Timestamp};
use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    task::Poll,
};

/// Sentinel stored while no deadline is pending
const NONE: u64 = u64::MAX;

/// Tracks the time by which a delayed acknowledgement must be sent
///
/// Requests are merged so that the soonest deadline wins: recording a request
/// can only ever move the pending deadline earlier. The deadline is held in a
/// single atomic value, so the scheduler can be shared between the connection
/// worker and any thread recording requests without additional locking.
///
/// ```
/// # use lumen_quic_core::{ack::Scheduler, time::{Duration, Timestamp}};
/// let scheduler = Scheduler::new(Timestamp::from_micros(1_000));
///
/// scheduler.record_delayed_send_request(Duration::from_millis(200));
/// scheduler.record_delayed_send_request(Duration::from_millis(100));
///
/// assert_eq!(
///     scheduler.next_scheduled_time(),
///     Some(Timestamp::from_micros(101_000))
/// );
/// ```
pub struct Scheduler<C = StdClock> {
    clock: C,
    deadline: AtomicU64,
}

impl Default for Scheduler<StdClock> {
    fn default() -> Self {
        Self::new(StdClock::default())
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            deadline: AtomicU64::new(NONE),
        }
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Requests an acknowledgement to be sent `delay` from now
    ///
    /// Returns the effective deadline after merging with any pending request.
    #[inline]
    pub fn record_delayed_send_request(&self, delay: Duration) -> Timestamp {
        let candidate = (self.clock.get_time() + delay).as_micros().min(NONE - 1);
        let previous = self.deadline.fetch_min(candidate, Ordering::AcqRel);
        let deadline = previous.min(candidate);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            delay = ?delay,
            candidate,
            deadline,
            "delayed send request"
        );

        Timestamp::from_micros(deadline)
    }

    /// Returns the pending deadline, if any
    ///
    /// The deadline stays pending until it is consumed with
    /// [`Self::poll_expiration`] or cleared with [`Self::cancel`].
    #[inline]
    pub fn next_scheduled_time(&self) -> Option<Timestamp> {
        match self.deadline.load(Ordering::Acquire) {
            NONE => None,
            micros => Some(Timestamp::from_micros(micros)),
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.deadline.load(Ordering::Acquire) != NONE
    }

    /// Consumes the pending deadline if it has elapsed at `current_time`
    ///
    /// A deadline recorded concurrently that has not yet elapsed is left pending.
    #[inline]
    pub fn poll_expiration(&self, current_time: Timestamp) -> Poll<()> {
        let now = current_time.as_micros();
        let result = self
            .deadline
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |deadline| {
                (deadline != NONE && deadline <= now).then_some(NONE)
            });

        if result.is_ok() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }

    /// Clears the pending deadline
    #[inline]
    pub fn cancel(&self) {
        self.deadline.store(NONE, Ordering::Release);
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deadline = match self.deadline.load(Ordering::Relaxed) {
            NONE => None,
            micros => Some(Timestamp::from_micros(micros)),
        };
        f.debug_struct("Scheduler")
            .field("deadline", &deadline)
            .finish()
    }
}
