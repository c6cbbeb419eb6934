// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use lumen_quic_core::time::Timestamp;

/// A datagram received from the network, waiting to be processed by its connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedDatagram {
    /// Position of the datagram in the endpoint's arrival order
    pub sequence_number: u64,
    pub received_at: Timestamp,
    pub payload: Bytes,
}

impl ReceivedDatagram {
    #[inline]
    pub fn new(sequence_number: u64, received_at: Timestamp, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence_number,
            received_at,
            payload: payload.into(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
