// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod ack;
pub mod connection;
pub mod endpoint;
pub mod frame;
pub mod stream;
pub mod time;
pub mod varint;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
