// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Types and utilities around the QUIC Stream identifier

use crate::{
    endpoint,
    stream::{Direction, StreamType},
    varint::VarInt,
};
use core::fmt;

/// The ID of a stream.
///
/// A stream ID is a 62-bit integer (0 to 2^62-1) that is unique for all streams
/// on a connection. The stream type is never stored; it is derived from the
/// two least significant bits on demand.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
pub struct StreamId(VarInt);

impl From<StreamId> for VarInt {
    #[inline]
    fn from(id: StreamId) -> Self {
        id.0
    }
}

impl From<StreamId> for u64 {
    #[inline]
    fn from(id: StreamId) -> Self {
        id.0.as_u64()
    }
}

impl From<VarInt> for StreamId {
    #[inline]
    fn from(id: VarInt) -> Self {
        Self(id)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StreamId {
    #[inline]
    pub const fn from_varint(id: VarInt) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_varint(self) -> VarInt {
        self.0
    }

    /// Returns the first stream id of the given type
    ///
    /// ```
    /// # use lumen_quic_core::stream::{StreamId, StreamType};
    /// let id = StreamId::initial(StreamType::ServerUnidirectional);
    /// assert_eq!(3u64, id.as_varint().as_u64());
    /// ```
    #[inline]
    pub const fn initial(stream_type: StreamType) -> Self {
        Self(VarInt::from_u8(stream_type as u8))
    }

    /// Returns the n-th stream id of the given type, or `None` if it would exceed
    /// the varint range
    #[inline]
    pub fn nth(stream_type: StreamType, n: u64) -> Option<Self> {
        let id = n.checked_mul(4)?.checked_add(stream_type.bits())?;
        VarInt::new(id).ok().map(Self)
    }

    /// Returns the next id of the same type
    ///
    /// ```
    /// # use lumen_quic_core::stream::{StreamId, StreamType};
    /// let id = StreamId::initial(StreamType::ClientUnidirectional);
    /// assert_eq!(6u64, id.next_of_type().unwrap().as_varint().as_u64());
    /// ```
    #[inline]
    pub fn next_of_type(self) -> Option<Self> {
        self.0.checked_add(VarInt::from_u8(4)).map(Self)
    }

    /// Returns the type encoded in the two low bits of the id
    #[inline]
    pub fn stream_type(self) -> StreamType {
        match StreamType::from_bits(self.0.as_u64() & StreamType::MASK) {
            Ok(ty) => ty,
            // the mask restricts the value to the four defined variants
            Err(_) => unreachable!(),
        }
    }

    #[inline]
    pub fn initiator(self) -> endpoint::Type {
        self.stream_type().initiator()
    }

    #[inline]
    pub fn direction(self) -> Direction {
        self.stream_type().direction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::MAX_VARINT_VALUE;

    const TYPES: [StreamType; 4] = [
        StreamType::ClientBidirectional,
        StreamType::ServerBidirectional,
        StreamType::ClientUnidirectional,
        StreamType::ServerUnidirectional,
    ];

    #[test]
    fn initial_stream_ids() {
        for ty in TYPES {
            let id = StreamId::initial(ty);
            assert_eq!(ty, id.stream_type());
            assert_eq!(ty.initiator(), id.initiator());
            assert_eq!(ty.direction(), id.direction());
        }
    }

    #[test]
    fn nth_stream_id() {
        for ty in TYPES {
            let first = StreamId::nth(ty, 0).unwrap();
            assert_eq!(StreamId::initial(ty), first);

            for n in 1..10u64 {
                let nth = StreamId::nth(ty, n).unwrap();
                assert_eq!(u64::from(nth) - u64::from(first), n * 4);
                assert_eq!(nth.stream_type(), ty);
            }

            assert_eq!(StreamId::nth(ty, MAX_VARINT_VALUE / 2), None);
        }
    }

    #[test]
    fn next_of_type_overflow() {
        let max = StreamId::from_varint(VarInt::MAX);
        assert!(max.next_of_type().is_none());

        let last = StreamId::from_varint(VarInt::new(MAX_VARINT_VALUE - 4).unwrap());
        assert_eq!(
            last.next_of_type().map(StreamId::stream_type),
            Some(last.stream_type())
        );
    }
}
