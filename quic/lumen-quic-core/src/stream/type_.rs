// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::endpoint;
use core::fmt;

/// Whether data can be transmitted on a stream in both directions or only in one
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Bidirectional,
    Unidirectional,
}

//= https://www.rfc-editor.org/rfc/rfc9000#section-2.1
//# The two least significant bits from a stream ID therefore identify a
//# stream as one of four types, as summarized in Table 1.
//#
//#        +======+==================================+
//#        | Bits | Stream Type                      |
//#        +======+==================================+
//#        | 0x00 | Client-Initiated, Bidirectional  |
//#        +------+----------------------------------+
//#        | 0x01 | Server-Initiated, Bidirectional  |
//#        +------+----------------------------------+
//#        | 0x02 | Client-Initiated, Unidirectional |
//#        +------+----------------------------------+
//#        | 0x03 | Server-Initiated, Unidirectional |
//#        +------+----------------------------------+

/// One of the four stream types encoded in the low two bits of a stream id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamType {
    ClientBidirectional = 0b00,
    ServerBidirectional = 0b01,
    ClientUnidirectional = 0b10,
    ServerUnidirectional = 0b11,
}

/// The low bits of a stream id did not map onto a [`StreamType`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown stream type bits: {bits:#04x}")]
pub struct UnknownStreamType {
    pub bits: u64,
}

impl StreamType {
    pub const MASK: u64 = 0b11;

    /// Maps the two type bits onto a stream type
    ///
    /// Only values in `0..=3` are accepted; callers are expected to mask with
    /// [`Self::MASK`] first.
    #[inline]
    pub const fn from_bits(bits: u64) -> Result<Self, UnknownStreamType> {
        Ok(match bits {
            0b00 => Self::ClientBidirectional,
            0b01 => Self::ServerBidirectional,
            0b10 => Self::ClientUnidirectional,
            0b11 => Self::ServerUnidirectional,
            _ => return Err(UnknownStreamType { bits }),
        })
    }

    #[inline]
    pub const fn new(initiator: endpoint::Type, direction: Direction) -> Self {
        match (initiator, direction) {
            (endpoint::Type::Client, Direction::Bidirectional) => Self::ClientBidirectional,
            (endpoint::Type::Server, Direction::Bidirectional) => Self::ServerBidirectional,
            (endpoint::Type::Client, Direction::Unidirectional) => Self::ClientUnidirectional,
            (endpoint::Type::Server, Direction::Unidirectional) => Self::ServerUnidirectional,
        }
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self as u64
    }

    //= https://www.rfc-editor.org/rfc/rfc9000#section-2.1
    //# The least significant bit (0x01) of the stream ID identifies the
    //# initiator of the stream.
    #[inline]
    pub const fn initiator(self) -> endpoint::Type {
        if self.bits() & 0b01 == 0 {
            endpoint::Type::Client
        } else {
            endpoint::Type::Server
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9000#section-2.1
    //# The second least significant bit (0x02) of the stream ID distinguishes
    //# between bidirectional streams (with the bit set to 0) and
    //# unidirectional streams (with the bit set to 1).
    #[inline]
    pub const fn direction(self) -> Direction {
        if self.bits() & 0b10 == 0 {
            Direction::Bidirectional
        } else {
            Direction::Unidirectional
        }
    }

    #[inline]
    pub const fn is_bidirectional(self) -> bool {
        matches!(self.direction(), Direction::Bidirectional)
    }

    #[inline]
    pub const fn is_unidirectional(self) -> bool {
        !self.is_bidirectional()
    }

    /// Short label used in frame logging
    #[inline]
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::ClientBidirectional => "CBi",
            Self::ServerBidirectional => "SBi",
            Self::ClientUnidirectional => "CUni",
            Self::ServerUnidirectional => "SUni",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        for bits in 0..4 {
            let ty = StreamType::from_bits(bits).unwrap();
            assert_eq!(ty.bits(), bits);
            assert_eq!(StreamType::new(ty.initiator(), ty.direction()), ty);
        }
    }

    #[test]
    fn unknown_bits() {
        assert_eq!(
            StreamType::from_bits(4),
            Err(UnknownStreamType { bits: 4 })
        );
    }

    #[test]
    fn table() {
        use crate::endpoint::Type::*;
        use Direction::*;

        assert_eq!(StreamType::ClientBidirectional.initiator(), Client);
        assert_eq!(StreamType::ServerBidirectional.initiator(), Server);
        assert_eq!(StreamType::ClientUnidirectional.direction(), Unidirectional);
        assert_eq!(StreamType::ServerUnidirectional.direction(), Unidirectional);
        assert!(StreamType::ServerBidirectional.is_bidirectional());
        assert!(StreamType::ClientUnidirectional.is_unidirectional());
    }
}
