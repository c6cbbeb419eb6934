// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Routes received datagrams to the pipeline of their connection

use crate::{
    pipeline::{self, Pipeline},
    Connection,
};
use bytes::Bytes;
use core::{
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};
use hashbrown::HashMap;
use lumen_quic_core::{
    connection,
    time::{Clock, StdClock},
};
use parking_lot::Mutex;
use tracing::{debug, trace};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("connection {0} is already active")]
    DuplicateConnection(connection::Id),
    #[error("no connection with id {0}")]
    UnknownConnection(connection::Id),
    #[error(transparent)]
    Pipeline(#[from] crate::Error),
}

/// Owns the pipelines of all active connections
///
/// Every datagram routed through the endpoint is stamped with the next sequence
/// number and the arrival time before it is queued.
pub struct Endpoint<C: Connection, Clk: Clock = StdClock> {
    config: pipeline::Config,
    clock: Clk,
    next_sequence_number: AtomicU64,
    pipelines: Mutex<HashMap<connection::Id, Pipeline>>,
    connection: PhantomData<fn(C)>,
}

impl<C: Connection> Default for Endpoint<C> {
    fn default() -> Self {
        Self::new(pipeline::Config::default(), StdClock::default())
    }
}

impl<C: Connection, Clk: Clock> Endpoint<C, Clk> {
    pub fn new(config: pipeline::Config, clock: Clk) -> Self {
        Self {
            config,
            clock,
            next_sequence_number: AtomicU64::new(0),
            pipelines: Mutex::new(HashMap::new()),
            connection: PhantomData,
        }
    }

    /// Starts a pipeline for a newly created connection
    ///
    /// A terminated pipeline with the same id is replaced. Must be called from
    /// within a tokio runtime.
    pub fn accept(
        &self,
        connection: C,
        initial_packet: Option<C::InitialPacket>,
    ) -> Result<(), Error> {
        let odcid = connection.original_destination_connection_id();
        let mut pipelines = self.pipelines.lock();

        if pipelines
            .get(&odcid)
            .is_some_and(|pipeline| !pipeline.is_terminated())
        {
            return Err(Error::DuplicateConnection(odcid));
        }

        let pipeline = Pipeline::spawn(connection, initial_packet, &self.config);
        debug!(name = pipeline.name(), "accepted connection");
        pipelines.insert(odcid, pipeline);

        Ok(())
    }

    /// Queues `payload` for the connection with id `odcid`
    ///
    /// Returns the sequence number assigned to the datagram.
    pub fn route(&self, odcid: &connection::Id, payload: impl Into<Bytes>) -> Result<u64, Error> {
        let received_at = self.clock.get_time();
        let pipelines = self.pipelines.lock();
        let pipeline = pipelines
            .get(odcid)
            .ok_or(Error::UnknownConnection(*odcid))?;

        let sequence_number = self.next_sequence_number.fetch_add(1, Ordering::Relaxed);
        let payload = payload.into();
        trace!(%odcid, sequence_number, len = payload.len(), "routing datagram");

        pipeline.submit_datagram(sequence_number, received_at, payload)?;

        Ok(sequence_number)
    }

    /// Requests the worker of `odcid` to stop; returns false if it is unknown
    pub fn shutdown(&self, odcid: &connection::Id) -> bool {
        match self.pipelines.lock().get(odcid) {
            Some(pipeline) => {
                pipeline.shutdown();
                true
            }
            None => false,
        }
    }

    /// Requests every worker to stop
    pub fn shutdown_all(&self) {
        for pipeline in self.pipelines.lock().values() {
            pipeline.shutdown();
        }
    }

    /// Removes the pipeline of `odcid` without cancelling it
    ///
    /// The caller can [`join`](Pipeline::join) the returned pipeline; dropping it
    /// cancels the worker.
    pub fn remove(&self, odcid: &connection::Id) -> Option<Pipeline> {
        self.pipelines.lock().remove(odcid)
    }

    /// Drops all terminated pipelines and returns how many were removed
    pub fn prune(&self) -> usize {
        let mut pipelines = self.pipelines.lock();
        let before = pipelines.len();
        pipelines.retain(|_, pipeline| !pipeline.is_terminated());
        let pruned = before - pipelines.len();

        if pruned > 0 {
            debug!(pruned, active = pipelines.len(), "pruned terminated connections");
        }

        pruned
    }

    pub fn state(&self, odcid: &connection::Id) -> Option<pipeline::State> {
        self.pipelines.lock().get(odcid).map(Pipeline::state)
    }

    pub fn contains(&self, odcid: &connection::Id) -> bool {
        self.pipelines.lock().contains_key(odcid)
    }

    pub fn len(&self) -> usize {
        self.pipelines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.lock().is_empty()
    }
}
