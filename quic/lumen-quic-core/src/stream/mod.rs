// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

mod id;
mod type_;

pub use id::StreamId;
pub use type_::{Direction, StreamType, UnknownStreamType};
