// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Delivers received datagrams to connections, one worker task per connection

pub mod connection;
pub mod datagram;
pub mod endpoint;
mod error;
pub mod pipeline;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::Connection;
pub use datagram::ReceivedDatagram;
pub use endpoint::Endpoint;
pub use error::{Error, Exit};
pub use pipeline::Pipeline;
