// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Test helpers: tracing setup and a recording [`Connection`](crate::Connection)

use crate::{datagram::ReceivedDatagram, Error};
use bytes::Bytes;
use lumen_quic_core::{
    ack,
    connection,
    frame::{stream, LengthPolicy, StreamFrame},
    time::{Duration, StdClock, Timestamp},
};
use parking_lot::Mutex;
use s2n_codec::DecoderBuffer;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub fn init_tracing() {
    if cfg!(any(miri, fuzzing)) {
        return;
    }

    use std::sync::Once;

    static TRACING: Once = Once::new();

    // make sure this only gets initialized once
    TRACING.call_once(|| {
        let format = tracing_subscriber::fmt::format()
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .compact();

        let default_level = if cfg!(debug_assertions) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        let env_filter = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(default_level.into())
            .with_env_var("LUMEN_LOG")
            .from_env_lossy();

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .event_format(format)
            .with_test_writer()
            .init();
    });
}

/// Delay requested for acknowledging a datagram that carried stream data
pub const ACK_DELAY: Duration = Duration::from_millis(25);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Initial(Vec<StreamFrame>),
    Datagram {
        sequence_number: u64,
        received_at: Timestamp,
        frames: Vec<StreamFrame>,
    },
    Aborted(Error),
    Dropped,
}

#[derive(Debug, Default)]
struct Shared {
    events: Mutex<Vec<Event>>,
    closed: CancellationToken,
    notify: Notify,
}

/// Observes a [`Connection`] after it moved into its worker
#[derive(Clone, Debug)]
pub struct Handle {
    shared: Arc<Shared>,
    acks: Arc<ack::Scheduler>,
}

impl Handle {
    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().clone()
    }

    /// Sequence numbers of the processed datagrams, in processing order
    pub fn sequence_numbers(&self) -> Vec<u64> {
        self.shared
            .events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Datagram {
                    sequence_number, ..
                } => Some(*sequence_number),
                _ => None,
            })
            .collect()
    }

    pub fn is_aborted(&self) -> bool {
        self.shared
            .events
            .lock()
            .iter()
            .any(|event| matches!(event, Event::Aborted(_)))
    }

    /// Waits until the worker has dropped the connection
    pub async fn wait_for_drop(&self) {
        self.wait_for(|events| events.contains(&Event::Dropped))
            .await
    }

    /// Closes the connection from outside the worker
    pub fn close(&self) {
        self.shared.closed.cancel();
    }

    pub fn acks(&self) -> &ack::Scheduler {
        &self.acks
    }

    /// Waits until `predicate` holds for the recorded events
    pub async fn wait_for<F>(&self, mut predicate: F)
    where
        F: FnMut(&[Event]) -> bool,
    {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let done = {
                let events = self.shared.events.lock();
                predicate(&events)
            };

            if done {
                return;
            }

            notified.await;
        }
    }

    /// Waits until `count` datagrams have been processed
    pub async fn wait_for_datagrams(&self, count: usize) {
        self.wait_for(|events| {
            events
                .iter()
                .filter(|event| matches!(event, Event::Datagram { .. }))
                .count()
                >= count
        })
        .await
    }
}

/// A connection that decodes every payload as a run of STREAM frames
///
/// Decoding failures are returned as processing errors, which aborts the
/// connection.
#[derive(Debug)]
pub struct Connection {
    odcid: connection::Id,
    policy: LengthPolicy,
    close_after: Option<u64>,
    panic_on: Option<u64>,
    shared: Arc<Shared>,
    acks: Arc<ack::Scheduler>,
}

impl Connection {
    pub fn new(odcid: &[u8]) -> (Self, Handle) {
        let odcid = connection::Id::try_from_bytes(odcid).expect("valid connection id");
        let shared = Arc::new(Shared::default());
        let acks = Arc::new(ack::Scheduler::new(StdClock::default()));
        let connection = Self {
            odcid,
            policy: LengthPolicy::default(),
            close_after: None,
            panic_on: None,
            shared: shared.clone(),
            acks: acks.clone(),
        };
        (connection, Handle { shared, acks })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: LengthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Closes the connection once the datagram with `sequence_number` is processed
    #[must_use]
    pub fn with_close_after(mut self, sequence_number: u64) -> Self {
        self.close_after = Some(sequence_number);
        self
    }

    /// Panics while processing the datagram with `sequence_number`
    #[must_use]
    pub fn with_panic_on(mut self, sequence_number: u64) -> Self {
        self.panic_on = Some(sequence_number);
        self
    }

    fn decode_frames(&self, payload: &[u8]) -> Result<Vec<StreamFrame>, stream::Error> {
        let mut buffer = DecoderBuffer::new(payload);
        let mut frames = vec![];

        while !buffer.is_empty() {
            let (frame, remaining) = StreamFrame::decode_with_policy(buffer, self.policy)?;
            let delay = if frame.is_fin() {
                Duration::ZERO
            } else {
                ACK_DELAY
            };
            self.acks.record_delayed_send_request(delay);
            frames.push(frame);
            buffer = remaining;
        }

        Ok(frames)
    }

    fn record(&self, event: Event) {
        self.shared.events.lock().push(event);
        self.shared.notify.notify_waiters();
    }
}

impl crate::Connection for Connection {
    type InitialPacket = Bytes;
    type Error = stream::Error;

    fn original_destination_connection_id(&self) -> connection::Id {
        self.odcid
    }

    fn close_token(&self) -> CancellationToken {
        self.shared.closed.clone()
    }

    fn process_initial_packet(&mut self, packet: Bytes) -> Result<(), Self::Error> {
        let frames = self.decode_frames(&packet)?;
        self.record(Event::Initial(frames));
        Ok(())
    }

    fn process_datagram(&mut self, datagram: ReceivedDatagram) -> Result<(), Self::Error> {
        let ReceivedDatagram {
            sequence_number,
            received_at,
            payload,
        } = datagram;

        if self.panic_on == Some(sequence_number) {
            panic!("injected panic on datagram {sequence_number}");
        }

        let frames = self.decode_frames(&payload)?;
        self.record(Event::Datagram {
            sequence_number,
            received_at,
            frames,
        });

        if self.close_after == Some(sequence_number) {
            self.shared.closed.cancel();
        }

        Ok(())
    }

    fn abort(&mut self, error: &Error) {
        self.shared.closed.cancel();
        self.record(Event::Aborted(error.clone()));
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.record(Event::Dropped);
    }
}

/// Encodes a single STREAM frame carrying `data` on stream 0
pub fn stream_payload(offset: u64, data: &'static [u8], is_fin: bool) -> Bytes {
    use lumen_quic_core::{stream::StreamId, varint::VarInt};

    let offset = VarInt::new(offset).expect("valid offset");
    StreamFrame::new(StreamId::from_varint(VarInt::ZERO), offset, data, is_fin)
        .expect("valid frame")
        .as_bytes()
        .clone()
}
