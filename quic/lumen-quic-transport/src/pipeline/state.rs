// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Lifecycle of a connection's worker
///
/// ```text
/// Starting -> Running -> ShuttingDown -> Terminated
///                    \-> Aborted ------/
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum State {
    /// The worker has not started consuming datagrams yet
    Starting = 0,
    Running = 1,
    /// Cancellation was observed; queued datagrams are discarded
    ShuttingDown = 2,
    /// Processing failed; the connection is being aborted
    Aborted = 3,
    Terminated = 4,
}

impl State {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            3 => Self::Aborted,
            _ => Self::Terminated,
        }
    }

    #[inline]
    pub fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }

    #[inline]
    fn can_transition_to(self, next: Self) -> bool {
        use State::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, ShuttingDown)
                | (Running, ShuttingDown)
                | (Starting, Aborted)
                | (Running, Aborted)
                | (ShuttingDown, Terminated)
                | (Aborted, Terminated)
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Aborted => "aborted",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// The current [`State`], shared between the worker and its [`Pipeline`](super::Pipeline)
#[derive(Debug)]
pub(crate) struct Shared(AtomicU8);

impl Default for Shared {
    fn default() -> Self {
        Self(AtomicU8::new(State::Starting as u8))
    }
}

impl Shared {
    #[inline]
    pub fn load(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next`, returning false if the transition is not allowed
    ///
    /// Only the worker calls this, so no transitions race with each other.
    #[inline]
    pub fn transition(&self, next: State) -> bool {
        let current = self.load();
        if !current.can_transition_to(next) {
            debug_assert!(false, "invalid transition {current} -> {next}");
            return false;
        }
        self.0.store(next as u8, Ordering::Release);
        true
    }
}
