// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, num::NonZeroUsize};

/// Prefix of the worker name, followed by the hex connection id
pub const DEFAULT_NAME_PREFIX: &str = "receiver";

#[derive(Clone, Debug)]
pub struct Config {
    queue_capacity: Option<NonZeroUsize>,
    name_prefix: Cow<'static, str>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            name_prefix: Cow::Borrowed(DEFAULT_NAME_PREFIX),
        }
    }
}

impl Config {
    /// Bounds the receive queue to `capacity` datagrams
    ///
    /// Datagrams submitted to a full queue are rejected with
    /// [`Error::QueueFull`](crate::Error::QueueFull). By default the queue is unbounded.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_unbounded_queue(mut self) -> Self {
        self.queue_capacity = None;
        self
    }

    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    #[inline]
    pub fn queue_capacity(&self) -> Option<NonZeroUsize> {
        self.queue_capacity
    }

    #[inline]
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }
}
