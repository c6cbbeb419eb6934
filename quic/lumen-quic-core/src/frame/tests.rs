// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::stream::{is_stream_tag, Error};
use super::*;
use crate::{
    stream::{StreamId, StreamType},
    varint::VarInt,
};
use bolero::check;
use s2n_codec::{DecoderBuffer, Encoder, EncoderBuffer, EncoderValue};

const POLICIES: [LengthPolicy; 2] = [LengthPolicy::UseRemaining, LengthPolicy::TrustDeclared];

fn stream_id(id: u8) -> StreamId {
    StreamId::from_varint(VarInt::from_u8(id))
}

fn decode(bytes: &[u8], policy: LengthPolicy) -> Result<(StreamFrame, usize), Error> {
    let (frame, remaining) = StreamFrame::decode_with_policy(DecoderBuffer::new(bytes), policy)?;
    Ok((frame, remaining.len()))
}

#[test]
fn round_trip() {
    check!()
        .with_type::<(VarInt, VarInt, Vec<u8>, bool)>()
        .for_each(|(id, offset, data, is_fin)| {
            let Ok(frame) = StreamFrame::new(StreamId::from_varint(*id), *offset, data.clone(), *is_fin)
            else {
                // offset + length exceeds the varint range
                assert!(offset.checked_add_usize(data.len()).is_none());
                return;
            };

            assert_eq!(frame.as_bytes().len(), frame.encoding_size());
            assert!(frame.encoding_size() <= StreamFrame::max_frame_size(frame.stream_id(), data.len()));

            for policy in POLICIES {
                let (decoded, remaining) = decode(frame.as_bytes(), policy).unwrap();
                assert_eq!(remaining, 0);
                assert_eq!(decoded, frame);
                assert_eq!(decoded.stream_type(), frame.stream_type());
            }
        });
}

#[test]
fn decode_never_panics() {
    check!().for_each(|input| {
        for policy in POLICIES {
            if let Ok((frame, remaining)) = decode(input, policy) {
                assert_eq!(frame.as_bytes().len() + remaining, input.len());
                assert_eq!(&input[..frame.as_bytes().len()], &frame.as_bytes()[..]);
                assert!(frame.len() <= frame.as_bytes().len());
            }
        }
    });
}

#[test]
fn wire_layout() {
    let frame = StreamFrame::new(stream_id(4), VarInt::ZERO, &b"hello"[..], false).unwrap();
    assert_eq!(
        &frame.as_bytes()[..],
        &[0x16, 0x04, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o'][..]
    );

    let frame = StreamFrame::new(stream_id(3), VarInt::from_u16(300), &b"x"[..], true).unwrap();
    assert_eq!(
        &frame.as_bytes()[..],
        &[0x17, 0x03, 0x41, 0x2c, 0x01, b'x'][..]
    );
    assert_eq!(frame.stream_type(), StreamType::ServerUnidirectional);
    assert_eq!(frame.end_offset(), 301);
}

#[test]
fn encoder_value() {
    let frame = StreamFrame::at_start(stream_id(0), &b"abc"[..], true).unwrap();

    let mut bytes = vec![0u8; 32];
    let mut encoder = EncoderBuffer::new(&mut bytes);
    encoder.encode(&frame);
    let len = encoder.len();

    assert_eq!(len, frame.encoding_size());
    assert_eq!(&bytes[..len], &frame.as_bytes()[..]);
}

#[test]
fn empty_frame_keeps_length_field() {
    let frame = StreamFrame::at_start(stream_id(8), &b""[..], true).unwrap();
    assert_eq!(&frame.as_bytes()[..], &[0x17, 0x08, 0x00, 0x00][..]);
    assert!(frame.is_empty());
    assert_eq!(frame.declared_length(), Some(VarInt::ZERO));
}

#[test]
fn offset_plus_length_overflow() {
    let offset = VarInt::MAX.checked_sub(VarInt::from_u8(2)).unwrap();
    assert!(StreamFrame::new(stream_id(0), offset, &b"ab"[..], false).is_ok());
    assert!(StreamFrame::new(stream_id(0), offset, &b"abc"[..], false).is_err());
}

#[test]
fn declared_length_matches_remaining() {
    let bytes = [0x16, 0x04, 0x00, 0x03, 1, 2, 3];

    for policy in POLICIES {
        let (frame, remaining) = decode(&bytes, policy).unwrap();
        assert_eq!(remaining, 0);
        assert_eq!(&frame.data()[..], &[1, 2, 3]);
        assert_eq!(frame.declared_length(), Some(VarInt::from_u8(3)));
    }
}

#[test]
fn declared_length_shorter_than_remaining() {
    let mut bytes = vec![0x16, 0x04, 0x00, 0x05];
    bytes.extend(0..10u8);

    let (frame, remaining) = decode(&bytes, LengthPolicy::UseRemaining).unwrap();
    assert_eq!(frame.len(), 10);
    assert_eq!(remaining, 0);
    assert_eq!(frame.declared_length(), Some(VarInt::from_u8(5)));

    let (frame, remaining) = decode(&bytes, LengthPolicy::TrustDeclared).unwrap();
    assert_eq!(&frame.data()[..], &[0, 1, 2, 3, 4]);
    assert_eq!(remaining, 5);
    assert_eq!(frame.declared_length(), Some(VarInt::from_u8(5)));
}

#[test]
fn default_policy_is_use_remaining() {
    assert_eq!(LengthPolicy::default(), LengthPolicy::UseRemaining);

    let bytes = [0x16, 0x00, 0x00, 0x01, 9, 9];
    let (frame, remaining) = StreamFrame::decode(DecoderBuffer::new(&bytes)).unwrap();
    assert_eq!(frame.len(), 2);
    assert!(remaining.is_empty());
}

#[test]
fn missing_length_field() {
    let bytes = [0x14, 0x00, 0x03, b'a', b'b', b'c'];

    let (frame, remaining) = decode(&bytes, LengthPolicy::UseRemaining).unwrap();
    assert!(frame.is_empty());
    assert_eq!(frame.declared_length(), None);
    assert_eq!(frame.offset(), VarInt::from_u8(3));
    assert_eq!(remaining, 3);

    let (frame, remaining) = decode(&bytes, LengthPolicy::TrustDeclared).unwrap();
    assert_eq!(&frame.data()[..], b"abc");
    assert_eq!(remaining, 0);
}

#[test]
fn missing_offset_field() {
    let bytes = [0x13, 0x01, 0x02, b'o', b'k'];

    for policy in POLICIES {
        let (frame, _) = decode(&bytes, policy).unwrap();
        assert_eq!(frame.offset(), VarInt::ZERO);
        assert!(frame.is_fin());
        assert_eq!(&frame.data()[..], b"ok");
    }
}

#[test]
fn zero_declared_length() {
    let bytes = [0x16, 0x00, 0x00, 0x00, b'x', b'y'];

    for policy in POLICIES {
        let (frame, remaining) = decode(&bytes, policy).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.declared_length(), Some(VarInt::ZERO));
        assert_eq!(remaining, 2);
    }
}

#[test]
fn truncated_fields() {
    for bytes in [&[][..], &[0x16], &[0x16, 0x04], &[0x16, 0x04, 0x00], &[0x16, 0x44]] {
        for policy in POLICIES {
            assert!(
                matches!(decode(bytes, policy), Err(Error::MalformedEncoding { .. })),
                "{bytes:?}"
            );
        }
    }
}

#[test]
fn declared_length_exceeds_buffer() {
    let bytes = [0x16, 0x04, 0x00, 0x09, b'a', b'b'];

    assert_eq!(
        decode(&bytes, LengthPolicy::TrustDeclared).unwrap_err(),
        Error::BufferUnderflow {
            expected: 9,
            available: 2
        }
    );

    let (frame, _) = decode(&bytes, LengthPolicy::UseRemaining).unwrap();
    assert_eq!(&frame.data()[..], b"ab");
}

#[test]
fn not_a_stream_frame() {
    for tag in [0x00, 0x08, 0x0f, 0x18, 0x1f, 0xff] {
        assert!(!is_stream_tag(tag));
        let bytes = [tag, 0x00, 0x00, 0x00];
        assert!(matches!(
            decode(&bytes, LengthPolicy::UseRemaining),
            Err(Error::MalformedEncoding { .. })
        ));
    }

    for tag in 0x10..=0x17 {
        assert!(is_stream_tag(tag));
    }
}

#[test]
fn error_codes() {
    let malformed = Error::MalformedEncoding { reason: "test" };
    assert!(malformed.is_protocol_violation());
    assert_eq!(malformed.transport_error_code(), VarInt::from_u8(0x07));

    let underflow = Error::BufferUnderflow {
        expected: 1,
        available: 0,
    };
    assert!(underflow.is_protocol_violation());

    let unknown = Error::from(crate::stream::UnknownStreamType { bits: 7 });
    assert!(!unknown.is_protocol_violation());
    assert_eq!(unknown.transport_error_code(), VarInt::from_u8(0x01));
}

#[test]
fn display() {
    let frame = StreamFrame::new(stream_id(4), VarInt::from_u8(10), &b"hello"[..], false).unwrap();
    assert_eq!(frame.to_string(), "Stream[4(CBi),10,5]");

    let frame = StreamFrame::at_start(stream_id(7), &b""[..], true).unwrap();
    assert_eq!(frame.to_string(), "Stream[7(SUni),0,0]");
}

#[test]
fn max_frame_size_covers_largest_fields() {
    let offset = VarInt::MAX.checked_sub(VarInt::from_u8(3)).unwrap();
    let frame = StreamFrame::new(stream_id(0), offset, &b"abc"[..], false).unwrap();

    // the Offset field already uses its largest encoding; Length takes 1 of 8 bytes
    assert_eq!(
        StreamFrame::max_frame_size(stream_id(0), 3),
        frame.encoding_size() + 7
    );
}
