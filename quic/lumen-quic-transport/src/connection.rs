// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{datagram::ReceivedDatagram, Error};
use lumen_quic_core::connection;
use tokio_util::sync::CancellationToken;

/// The connection state driven by a [`Pipeline`](crate::Pipeline)
///
/// Every method is called from the connection's worker task only, so
/// implementations can mutate their state without locking.
pub trait Connection: 'static + Send {
    /// The packet that caused the connection to be created
    type InitialPacket: 'static + Send;

    /// The error returned when a packet cannot be processed
    type Error: core::fmt::Display;

    /// The destination connection id chosen by the client in its first packet
    fn original_destination_connection_id(&self) -> connection::Id;

    /// A token the connection cancels once it reaches a closed state
    ///
    /// The worker waits on it alongside the receive queue, so a connection that
    /// closes while idle still ends its pipeline.
    fn close_token(&self) -> CancellationToken;

    /// Returns true once the connection has reached a closed state
    #[inline]
    fn is_closed(&self) -> bool {
        self.close_token().is_cancelled()
    }

    /// Processes the packet that created the connection
    fn process_initial_packet(&mut self, packet: Self::InitialPacket) -> Result<(), Self::Error>;

    /// Parses the packets in `datagram` and processes them
    fn process_datagram(&mut self, datagram: ReceivedDatagram) -> Result<(), Self::Error>;

    /// Called once when processing failed; the connection should close and release its resources
    fn abort(&mut self, error: &Error);
}
