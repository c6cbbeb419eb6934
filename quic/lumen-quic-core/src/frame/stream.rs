// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::Tag,
    stream::{StreamId, StreamType, UnknownStreamType},
    varint::{VarInt, VarIntError},
};
use bytes::Bytes;
use core::{fmt, mem::size_of};
use s2n_codec::{DecoderBuffer, DecoderError, Encoder, EncoderBuffer, EncoderValue};

//= https://www.rfc-editor.org/rfc/rfc9000#section-19.8
//# The value of the three low-order bits of the frame
//# type determines the fields that are present in the frame.
//
// Peers speaking this codec identify the STREAM family with bit 0x10; the
// three flag bits below it keep their RFC meaning.

const STREAM_TAG: Tag = 0x10;
const FLAGS_MASK: Tag = 0x07;

//# The OFF bit (0x04) in the frame type is set to indicate that there
//# is an Offset field present.
const OFF_BIT: Tag = 0x04;

//# The LEN bit (0x02) in the frame type is set to indicate that there
//# is a Length field present.
const LEN_BIT: Tag = 0x02;

//# The FIN bit (0x01) of the frame type is set only on frames that
//# contain the final size of the stream.
const FIN_BIT: Tag = 0x01;

/// Largest encoding of the Offset field
const MAX_OFFSET_SIZE: usize = 8;
/// Largest encoding of the Length field
const MAX_LENGTH_SIZE: usize = 8;

/// Returns true if `tag` belongs to the STREAM frame family
#[inline]
pub const fn is_stream_tag(tag: Tag) -> bool {
    tag & !FLAGS_MASK == STREAM_TAG
}

/// How the number of payload bytes is resolved while decoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthPolicy {
    /// A positive Length field is replaced by the number of bytes remaining in
    /// the buffer; a zero or absent Length field yields an empty payload.
    ///
    /// This is the behavior deployed peers expect and is kept as the default
    /// until it has been confirmed against RFC 9000 section 19.8.
    #[default]
    UseRemaining,
    /// The Length field is used as-is when present; when the LEN bit is unset the
    /// payload extends to the end of the buffer.
    TrustDeclared,
}

impl LengthPolicy {
    #[inline]
    fn resolve(self, declared: Option<VarInt>, remaining: usize) -> u64 {
        match self {
            Self::UseRemaining => match declared {
                Some(len) if len.as_u64() > 0 => remaining as u64,
                _ => 0,
            },
            Self::TrustDeclared => match declared {
                Some(len) => len.as_u64(),
                None => remaining as u64,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("malformed stream frame: {reason}")]
    MalformedEncoding { reason: &'static str },
    #[error(transparent)]
    UnknownStreamType(#[from] UnknownStreamType),
    #[error("stream frame declares {expected} bytes of data but only {available} remain")]
    BufferUnderflow { expected: u64, available: usize },
}

impl Error {
    //= https://www.rfc-editor.org/rfc/rfc9000#section-20.1
    //# FRAME_ENCODING_ERROR (0x07):  An endpoint received a frame that was
    //#    badly formatted
    pub const FRAME_ENCODING_ERROR: VarInt = VarInt::from_u8(0x07);

    //# INTERNAL_ERROR (0x01):  The endpoint encountered an internal error
    //#    and cannot continue with the connection.
    pub const INTERNAL_ERROR: VarInt = VarInt::from_u8(0x01);

    /// Returns true if the peer sent bytes that violate the frame format
    #[inline]
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::UnknownStreamType(_))
    }

    /// The transport error code the connection should close with
    #[inline]
    pub fn transport_error_code(&self) -> VarInt {
        if self.is_protocol_violation() {
            Self::FRAME_ENCODING_ERROR
        } else {
            Self::INTERNAL_ERROR
        }
    }
}

impl From<DecoderError> for Error {
    #[inline]
    fn from(error: DecoderError) -> Self {
        let reason = match error {
            DecoderError::UnexpectedEof(_) => "unexpected end of buffer",
            DecoderError::InvariantViolation(reason) => reason,
            _ => "invalid field encoding",
        };
        Self::MalformedEncoding { reason }
    }
}

pub type DecodeResult<'a> = Result<(StreamFrame, DecoderBuffer<'a>), Error>;

/// A STREAM frame
///
/// Frames are immutable once built. Frames created for sending carry their
/// finished wire encoding; frames decoded from a packet keep a copy of the
/// bytes they were parsed from.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamFrame {
    stream_id: StreamId,
    offset: VarInt,
    /// The value of the Length field, if the LEN bit was set
    declared_length: Option<VarInt>,
    is_fin: bool,
    data: Bytes,
    encoding: Bytes,
}

impl StreamFrame {
    /// Builds a frame carrying `data` at `offset` of the stream
    ///
    /// The encoding always includes the Offset and Length fields.
    pub fn new(
        stream_id: StreamId,
        offset: VarInt,
        data: impl Into<Bytes>,
        is_fin: bool,
    ) -> Result<Self, VarIntError> {
        let data = data.into();
        let length = VarInt::try_from(data.len())?;

        //= https://www.rfc-editor.org/rfc/rfc9000#section-19.8
        //# The largest offset delivered on a stream - the sum of the offset and data length -
        //# cannot exceed 2^62-1
        offset.checked_add(length).ok_or(VarIntError)?;

        let mut tag = STREAM_TAG | OFF_BIT | LEN_BIT;
        if is_fin {
            tag |= FIN_BIT;
        }

        let stream_id_varint = stream_id.as_varint();
        let size = size_of::<Tag>()
            + stream_id_varint.encoding_size()
            + offset.encoding_size()
            + length.encoding_size()
            + data.len();

        let mut encoding = vec![0u8; size];
        let mut encoder = EncoderBuffer::new(&mut encoding);
        encoder.encode(&tag);
        encoder.encode(&stream_id_varint);
        encoder.encode(&offset);
        encoder.encode(&length);
        encoder.write_slice(&data);
        debug_assert_eq!(encoder.len(), size);

        Ok(Self {
            stream_id,
            offset,
            declared_length: Some(length),
            is_fin,
            data,
            encoding: encoding.into(),
        })
    }

    /// Builds a frame carrying the first bytes of a stream
    #[inline]
    pub fn at_start(
        stream_id: StreamId,
        data: impl Into<Bytes>,
        is_fin: bool,
    ) -> Result<Self, VarIntError> {
        Self::new(stream_id, VarInt::ZERO, data, is_fin)
    }

    /// Decodes a frame with the default [`LengthPolicy`]
    #[inline]
    pub fn decode(buffer: DecoderBuffer<'_>) -> DecodeResult<'_> {
        Self::decode_with_policy(buffer, LengthPolicy::default())
    }

    /// Decodes a frame starting at the frame type byte
    ///
    /// Returns the frame and the part of `buffer` following it.
    pub fn decode_with_policy(buffer: DecoderBuffer<'_>, policy: LengthPolicy) -> DecodeResult<'_> {
        let start = buffer;

        let (tag, buffer) = buffer.decode::<Tag>()?;
        if !is_stream_tag(tag) {
            return Err(Error::MalformedEncoding {
                reason: "frame type is not a stream frame",
            });
        }

        let has_offset = tag & OFF_BIT == OFF_BIT;
        let has_length = tag & LEN_BIT == LEN_BIT;
        let is_fin = tag & FIN_BIT == FIN_BIT;

        let (stream_id, buffer) = buffer.decode::<VarInt>()?;
        StreamType::from_bits(stream_id.as_u64() & StreamType::MASK)?;
        let stream_id = StreamId::from_varint(stream_id);

        let (offset, buffer) = if has_offset {
            buffer.decode::<VarInt>()?
        } else {
            (VarInt::ZERO, buffer)
        };

        let (declared_length, buffer) = if has_length {
            let (len, buffer) = buffer.decode::<VarInt>()?;
            (Some(len), buffer)
        } else {
            (None, buffer)
        };

        let available = buffer.len();
        let len = policy.resolve(declared_length, available);
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= available)
            .ok_or(Error::BufferUnderflow {
                expected: len,
                available,
            })?;

        let (data, buffer) = buffer.decode_slice(len)?;
        let data = Bytes::copy_from_slice(data.into_less_safe_slice());

        let consumed = start.len() - buffer.len();
        let encoding = Bytes::copy_from_slice(&start.into_less_safe_slice()[..consumed]);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            stream_id = %stream_id,
            offset = %offset,
            declared_length = ?declared_length,
            len,
            is_fin,
            "decoded stream frame"
        );

        let frame = Self {
            stream_id,
            offset,
            declared_length,
            is_fin,
            data,
            encoding,
        };

        Ok((frame, buffer))
    }

    #[inline]
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// The stream type, derived from the stream id
    #[inline]
    pub fn stream_type(&self) -> StreamType {
        self.stream_id.stream_type()
    }

    #[inline]
    pub fn offset(&self) -> VarInt {
        self.offset
    }

    /// The number of stream bytes carried by the frame
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The value of the Length field, or `None` if the LEN bit was unset
    ///
    /// This can differ from [`Self::len`] depending on the [`LengthPolicy`]
    /// the frame was decoded with.
    #[inline]
    pub fn declared_length(&self) -> Option<VarInt> {
        self.declared_length
    }

    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn is_fin(&self) -> bool {
        self.is_fin
    }

    /// The stream offset following the last byte of this frame
    #[inline]
    pub fn end_offset(&self) -> u64 {
        self.offset.as_u64() + self.data.len() as u64
    }

    /// The wire representation of the frame
    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.encoding
    }

    /// Returns an upper bound for the size of a frame carrying `payload_len` bytes
    #[inline]
    pub fn max_frame_size(stream_id: StreamId, payload_len: usize) -> usize {
        size_of::<Tag>()
            + stream_id.as_varint().encoding_size()
            + MAX_OFFSET_SIZE
            + MAX_LENGTH_SIZE
            + payload_len
    }
}

impl EncoderValue for StreamFrame {
    #[inline]
    fn encode<E: Encoder>(&self, encoder: &mut E) {
        encoder.write_slice(&self.encoding);
    }

    #[inline]
    fn encoding_size(&self) -> usize {
        self.encoding.len()
    }

    #[inline]
    fn encoding_size_for_encoder<E: Encoder>(&self, _encoder: &E) -> usize {
        self.encoding.len()
    }
}

impl fmt::Display for StreamFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream[{}({}),{},{}]",
            self.stream_id,
            self.stream_type(),
            self.offset,
            self.len()
        )
    }
}

impl fmt::Debug for StreamFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamFrame")
            .field("stream_id", &self.stream_id)
            .field("stream_type", &self.stream_type())
            .field("offset", &self.offset)
            .field("declared_length", &self.declared_length)
            .field("len", &self.data.len())
            .field("is_fin", &self.is_fin)
            .finish()
    }
}
