// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod stream;

#[cfg(test)]
mod tests;

pub use stream::{LengthPolicy, StreamFrame};

/// The leading frame type byte
pub type Tag = u8;
