// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-connection dispatch of received datagrams
//!
//! Each [`Pipeline`] owns a queue and a single worker task. The worker is the
//! only code that touches the connection, so connection state never needs
//! locking. Datagrams are processed in submission order, after the packet that
//! created the connection.

use crate::{datagram::ReceivedDatagram, Connection, Error, Exit};
use bytes::Bytes;
use core::fmt;
use lumen_quic_core::{connection, time::Timestamp};
use std::sync::Arc;
use tokio::{runtime, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;

mod config;
mod queue;
mod state;
mod worker;


pub use config::{Config, DEFAULT_NAME_PREFIX};
pub use state::State;

pub struct Pipeline {
    name: String,
    odcid: connection::Id,
    sender: queue::Sender,
    state: Arc<state::Shared>,
    token: CancellationToken,
    closed: CancellationToken,
    task: Option<JoinHandle<Exit>>,
}

impl Pipeline {
    /// Starts a worker for `connection` on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<C: Connection>(
        connection: C,
        initial_packet: Option<C::InitialPacket>,
        config: &Config,
    ) -> Self {
        Self::spawn_on(&runtime::Handle::current(), connection, initial_packet, config)
    }

    /// Starts a worker for `connection` on the given runtime
    pub fn spawn_on<C: Connection>(
        handle: &runtime::Handle,
        connection: C,
        initial_packet: Option<C::InitialPacket>,
        config: &Config,
    ) -> Self {
        let odcid = connection.original_destination_connection_id();
        let closed = connection.close_token();
        let name = format!("{}-{odcid}", config.name_prefix());
        let (sender, queue) = queue::channel(config.queue_capacity());
        let state = Arc::new(state::Shared::default());
        let token = CancellationToken::new();

        let worker = worker::Worker {
            connection,
            initial_packet,
            queue,
            token: token.clone(),
            state: state.clone(),
        };

        let span = tracing::debug_span!("receiver", %odcid);
        let task = handle.spawn(worker.run().instrument(span));

        tracing::debug!(%name, "spawned connection worker");

        Self {
            name,
            odcid,
            sender,
            state,
            token,
            closed,
            task: Some(task),
        }
    }

    /// Queues a datagram for the connection without waiting
    #[inline]
    pub fn submit_datagram(
        &self,
        sequence_number: u64,
        received_at: Timestamp,
        payload: impl Into<Bytes>,
    ) -> Result<(), Error> {
        self.submit(ReceivedDatagram::new(
            sequence_number,
            received_at,
            payload,
        ))
    }

    #[inline]
    pub fn submit(&self, datagram: ReceivedDatagram) -> Result<(), Error> {
        self.sender.send(datagram)
    }

    /// Returns true once the connection has closed or the worker has exited
    ///
    /// A closed connection is reported right away; its worker stops at its next wait.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.closed.is_cancelled() || self.state().is_terminated()
    }

    /// Asks the worker to stop at its next wait
    ///
    /// A datagram being processed is finished first; queued datagrams are discarded.
    #[inline]
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state.load()
    }

    /// The worker name, `<prefix>-<hex odcid>`
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn original_destination_connection_id(&self) -> &connection::Id {
        &self.odcid
    }

    /// Waits for the worker to exit and returns why it stopped
    ///
    /// This does not request a shutdown.
    pub async fn join(mut self) -> Exit {
        let Some(task) = self.task.take() else {
            return Exit::Shutdown;
        };

        match task.await {
            Ok(exit) => exit,
            Err(error) if error.is_panic() => Exit::Aborted(Error::panic(&*error.into_panic())),
            Err(_) => Exit::Aborted(Error::Closed),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
