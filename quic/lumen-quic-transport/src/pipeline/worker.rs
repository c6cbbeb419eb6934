// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{
    queue::Receiver,
    state::{Shared, State},
};
use crate::{Connection, Error, Exit};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Drives a single connection: the initial packet first, then the queue in order
pub(crate) struct Worker<C: Connection> {
    pub connection: C,
    pub initial_packet: Option<C::InitialPacket>,
    pub queue: Receiver,
    pub token: CancellationToken,
    pub state: Arc<Shared>,
}

impl<C: Connection> Worker<C> {
    pub async fn run(mut self) -> Exit {
        let exit = match self.process_all().await {
            Ok(()) => {
                self.state.transition(State::ShuttingDown);
                Exit::Shutdown
            }
            Err(error) => {
                self.state.transition(State::Aborted);
                error!(%error, "aborting connection");
                self.abort(&error);
                Exit::Aborted(error)
            }
        };

        // anything still queued is discarded
        self.queue.close();
        self.state.transition(State::Terminated);
        debug!(%exit, "worker terminated");

        exit
    }

    async fn process_all(&mut self) -> Result<(), Error> {
        if self.token.is_cancelled() {
            debug!("cancelled before start");
            return Ok(());
        }

        self.state.transition(State::Running);

        if let Some(packet) = self.initial_packet.take() {
            trace!("processing initial packet");
            self.process(|connection| connection.process_initial_packet(packet))?;
        }

        let closed = self.connection.close_token();

        loop {
            let datagram = tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    debug!("shutdown requested");
                    return Ok(());
                }
                _ = closed.cancelled() => {
                    debug!("connection closed");
                    return Ok(());
                }
                datagram = self.queue.recv() => datagram,
            };

            let Some(datagram) = datagram else {
                debug!("receive queue closed");
                return Ok(());
            };

            trace!(
                sequence_number = datagram.sequence_number,
                received_at = %datagram.received_at,
                len = datagram.len(),
                "processing datagram"
            );

            self.process(|connection| connection.process_datagram(datagram))?;
        }
    }

    /// Runs `f` against the connection, turning both errors and panics into [`Error`]
    #[inline]
    fn process<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut C) -> Result<(), C::Error>,
    {
        let connection = &mut self.connection;
        match catch_unwind(AssertUnwindSafe(|| f(connection))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(Error::fatal(error)),
            Err(panic) => Err(Error::panic(&*panic)),
        }
    }

    fn abort(&mut self, error: &Error) {
        let connection = &mut self.connection;
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| connection.abort(error))) {
            let abort_error = Error::panic(&*panic);
            error!(%abort_error, "connection abort panicked");
        }
    }
}
