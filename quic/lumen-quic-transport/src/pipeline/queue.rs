// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The per-connection receive queue
//!
//! Producers never wait: the unbounded flavor always accepts, the bounded
//! flavor rejects when full.

use crate::{datagram::ReceivedDatagram, Error};
use std::num::NonZeroUsize;
use tokio::sync::mpsc;

pub(crate) fn channel(capacity: Option<NonZeroUsize>) -> (Sender, Receiver) {
    match capacity {
        Some(capacity) => {
            let (sender, receiver) = mpsc::channel(capacity.get());
            (Sender::Bounded(sender), Receiver::Bounded(receiver))
        }
        None => {
            let (sender, receiver) = mpsc::unbounded_channel();
            (Sender::Unbounded(sender), Receiver::Unbounded(receiver))
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Sender {
    Bounded(mpsc::Sender<ReceivedDatagram>),
    Unbounded(mpsc::UnboundedSender<ReceivedDatagram>),
}

impl Sender {
    #[inline]
    pub fn send(&self, datagram: ReceivedDatagram) -> Result<(), Error> {
        match self {
            Self::Bounded(sender) => sender.try_send(datagram).map_err(|error| match error {
                mpsc::error::TrySendError::Full(_) => Error::QueueFull,
                mpsc::error::TrySendError::Closed(_) => Error::Closed,
            }),
            Self::Unbounded(sender) => sender.send(datagram).map_err(|_| Error::Closed),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Receiver {
    Bounded(mpsc::Receiver<ReceivedDatagram>),
    Unbounded(mpsc::UnboundedReceiver<ReceivedDatagram>),
}

impl Receiver {
    /// Waits for the next datagram; returns `None` once every sender is gone
    #[inline]
    pub async fn recv(&mut self) -> Option<ReceivedDatagram> {
        match self {
            Self::Bounded(receiver) => receiver.recv().await,
            Self::Unbounded(receiver) => receiver.recv().await,
        }
    }

    /// Stops accepting datagrams; already queued datagrams are dropped with the receiver
    #[inline]
    pub fn close(&mut self) {
        match self {
            Self::Bounded(receiver) => receiver.close(),
            Self::Unbounded(receiver) => receiver.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_quic_core::time::Timestamp;

    fn datagram(sequence_number: u64) -> ReceivedDatagram {
        ReceivedDatagram::new(sequence_number, Timestamp::default(), &b"x"[..])
    }

    #[tokio::test]
    async fn unbounded_is_fifo() {
        let (sender, mut receiver) = channel(None);
        for i in 0..1000 {
            sender.send(datagram(i)).unwrap();
        }
        for i in 0..1000 {
            assert_eq!(receiver.recv().await.unwrap().sequence_number, i);
        }
    }

    #[tokio::test]
    async fn bounded_rejects_when_full() {
        let (sender, mut receiver) = channel(NonZeroUsize::new(2));
        sender.send(datagram(0)).unwrap();
        sender.send(datagram(1)).unwrap();
        assert_eq!(sender.send(datagram(2)), Err(Error::QueueFull));

        assert_eq!(receiver.recv().await.unwrap().sequence_number, 0);
        sender.send(datagram(3)).unwrap();
        assert_eq!(receiver.recv().await.unwrap().sequence_number, 1);
        assert_eq!(receiver.recv().await.unwrap().sequence_number, 3);
    }

    #[tokio::test]
    async fn closed_receiver() {
        for capacity in [None, NonZeroUsize::new(4)] {
            let (sender, mut receiver) = channel(capacity);
            receiver.close();
            assert_eq!(sender.send(datagram(0)), Err(Error::Closed));
        }
    }

    #[tokio::test]
    async fn dropped_sender_ends_stream() {
        let (sender, mut receiver) = channel(None);
        sender.send(datagram(7)).unwrap();
        drop(sender);
        assert_eq!(receiver.recv().await.unwrap().sequence_number, 7);
        assert!(receiver.recv().await.is_none());
    }
}
