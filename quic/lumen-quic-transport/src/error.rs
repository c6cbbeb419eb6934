// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The pipeline no longer accepts datagrams
    #[error("the connection pipeline has terminated")]
    Closed,
    /// A bounded queue rejected the datagram
    #[error("the connection receive queue is full")]
    QueueFull,
    /// Processing a datagram returned an error
    #[error("datagram processing failed: {reason}")]
    WorkerFatal { reason: String },
    /// Processing a datagram panicked
    #[error("datagram processing panicked: {reason}")]
    WorkerPanic { reason: String },
}

impl Error {
    /// Returns true if the error ended the connection's worker
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::WorkerFatal { .. } | Self::WorkerPanic { .. })
    }

    pub(crate) fn fatal<E: fmt::Display>(error: E) -> Self {
        Self::WorkerFatal {
            reason: error.to_string(),
        }
    }

    pub(crate) fn panic(payload: &(dyn core::any::Any + Send)) -> Self {
        let reason = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::WorkerPanic { reason }
    }
}

/// The reason a connection's worker stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The worker was cancelled, or the connection closed itself
    Shutdown,
    /// Processing failed and the connection was aborted
    Aborted(Error),
}

impl Exit {
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    #[inline]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Shutdown => None,
            Self::Aborted(error) => Some(error),
        }
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "shutdown"),
            Self::Aborted(error) => write!(f, "aborted: {error}"),
        }
    }
}
