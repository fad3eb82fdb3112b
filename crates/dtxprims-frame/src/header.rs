use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::cursor::{ensure, ByteCursor};
use crate::error::{FrameError, Result};

/// Frame header size, and the only header length a frame may declare.
pub const HEADER_SIZE: usize = 32;

/// Magic value at offset 0, read big-endian.
pub const MAGIC: u32 = 0x795B_3D1F;

/// Size of the payload header following the frame header.
pub const PAYLOAD_HEADER_SIZE: usize = 16;

/// Size of the auxiliary header following the payload header.
pub const AUXILIARY_HEADER_SIZE: usize = 16;

/// Offset of the payload header within a message.
pub const PAYLOAD_HEADER_OFFSET: usize = HEADER_SIZE;

/// Offset of the auxiliary header within a message.
pub const AUXILIARY_HEADER_OFFSET: usize = PAYLOAD_HEADER_OFFSET + PAYLOAD_HEADER_SIZE;

/// The fixed 32-byte header that starts every frame.
///
/// ```text
/// ┌────────┬────────┬───────┬───────┬────────┬────────┬────────┬─────────┬────────┐
/// │ Magic  │ HdrLen │ FragI │ FragN │ MsgLen │ Ident  │ Conv   │ Channel │ Reply  │
/// │ 4B BE  │ 4B LE  │ 2B LE │ 2B LE │ 4B LE  │ 4B LE  │ 4B LE  │ 4B LE   │ 4B LE  │
/// └────────┴────────┴───────┴───────┴────────┴────────┴────────┴─────────┴────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub fragment_index: u16,
    pub fragment_count: u16,
    /// Length of the body after the header. For a first-fragment marker this is
    /// the length of the whole reassembled body.
    pub message_length: u32,
    pub identifier: u32,
    pub conversation_index: u32,
    pub channel_code: u32,
    pub expects_reply: bool,
}

impl FrameHeader {
    /// Parse and validate the header at the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        ensure(buf, HEADER_SIZE)?;
        let mut cur = ByteCursor::new(buf);

        let magic = cur.read_u32_be()?;
        if magic != MAGIC {
            return Err(FrameError::BadMagic { found: magic });
        }
        let header_length = cur.read_u32_le()?;
        if header_length as usize != HEADER_SIZE {
            return Err(FrameError::BadHeaderLength {
                found: header_length,
            });
        }

        Ok(Self {
            fragment_index: cur.read_u16_le()?,
            fragment_count: cur.read_u16_le()?,
            message_length: cur.read_u32_le()?,
            identifier: cur.read_u32_le()?,
            conversation_index: cur.read_u32_le()?,
            channel_code: cur.read_u32_le()?,
            expects_reply: cur.read_u32_le()? == 1,
        })
    }

    /// Write the 32-byte wire form of this header.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32(MAGIC);
        dst.put_u32_le(HEADER_SIZE as u32);
        dst.put_u16_le(self.fragment_index);
        dst.put_u16_le(self.fragment_count);
        dst.put_u32_le(self.message_length);
        dst.put_u32_le(self.identifier);
        dst.put_u32_le(self.conversation_index);
        dst.put_u32_le(self.channel_code);
        dst.put_u32_le(u32::from(self.expects_reply));
    }

    /// Declared body length as a `usize`.
    pub fn body_len(&self) -> usize {
        self.message_length as usize
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_count > 1
    }

    /// A first-fragment marker is only the 32-byte header.
    pub fn is_first_fragment(&self) -> bool {
        self.fragment_count > 1 && self.fragment_index == 0
    }

    pub fn is_last_fragment(&self) -> bool {
        self.is_fragment() && self.fragment_index.checked_add(1) == Some(self.fragment_count)
    }
}

/// The 16-byte header describing the auxiliary and payload lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadHeader {
    pub message_type: i32,
    /// Length of the auxiliary section including its 16-byte header.
    pub auxiliary_length: i32,
    /// Auxiliary length plus payload length.
    pub total_payload_length: i32,
    pub flags: i32,
}

impl PayloadHeader {
    /// Parse the payload header at `offset` within `buf`.
    pub fn parse(buf: &[u8], offset: usize) -> Result<Self> {
        let mut cur = ByteCursor::at(buf, offset)?;
        Ok(Self {
            message_type: cur.read_i32_le()?,
            auxiliary_length: cur.read_i32_le()?,
            total_payload_length: cur.read_i32_le()?,
            flags: cur.read_i32_le()?,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(PAYLOAD_HEADER_SIZE);
        dst.put_i32_le(self.message_type);
        dst.put_i32_le(self.auxiliary_length);
        dst.put_i32_le(self.total_payload_length);
        dst.put_i32_le(self.flags);
    }

    pub fn payload_length(&self) -> i32 {
        self.total_payload_length.saturating_sub(self.auxiliary_length)
    }

    pub fn has_auxiliary(&self) -> bool {
        self.auxiliary_length > 0
    }

    pub fn has_payload(&self) -> bool {
        self.payload_length() > 0
    }
}

/// The 16-byte header in front of the auxiliary dictionary.
///
/// Only `auxiliary_size` carries meaning; the rest are kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuxiliaryHeader {
    pub buffer_size: u32,
    pub reserved0: u32,
    pub auxiliary_size: u32,
    pub reserved1: u32,
}

impl AuxiliaryHeader {
    pub fn parse(buf: &[u8], offset: usize) -> Result<Self> {
        let mut cur = ByteCursor::at(buf, offset)?;
        Ok(Self {
            buffer_size: cur.read_u32_le()?,
            reserved0: cur.read_u32_le()?,
            auxiliary_size: cur.read_u32_le()?,
            reserved1: cur.read_u32_le()?,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(AUXILIARY_HEADER_SIZE);
        dst.put_u32_le(self.buffer_size);
        dst.put_u32_le(self.reserved0);
        dst.put_u32_le(self.auxiliary_size);
        dst.put_u32_le(self.reserved1);
    }
}

impl fmt::Display for AuxiliaryHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buffer_size={} reserved0={} auxiliary_size={} reserved1={}",
            self.buffer_size, self.reserved0, self.auxiliary_size, self.reserved1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FrameHeader {
        FrameHeader {
            fragment_index: 0,
            fragment_count: 1,
            message_length: 0x1234,
            identifier: 7,
            conversation_index: 1,
            channel_code: 0xFFFF_FFFF,
            expects_reply: true,
        }
    }

    #[test]
    fn header_round_trip_is_byte_exact() {
        let mut wire = BytesMut::new();
        sample_header().encode(&mut wire);
        assert_eq!(wire.len(), HEADER_SIZE);

        let parsed = FrameHeader::parse(&wire).unwrap();
        assert_eq!(parsed, sample_header());

        let mut again = BytesMut::new();
        parsed.encode(&mut again);
        assert_eq!(again, wire);
    }

    #[test]
    fn known_wire_bytes() {
        let wire: [u8; 32] = [
            0x79, 0x5B, 0x3D, 0x1F, // magic
            0x20, 0x00, 0x00, 0x00, // header length
            0x02, 0x00, // fragment index
            0x03, 0x00, // fragment count
            0x10, 0x00, 0x00, 0x00, // message length
            0x05, 0x00, 0x00, 0x00, // identifier
            0x01, 0x00, 0x00, 0x00, // conversation
            0x02, 0x00, 0x00, 0x00, // channel
            0x00, 0x00, 0x00, 0x00, // expects reply
        ];
        let h = FrameHeader::parse(&wire).unwrap();
        assert_eq!(h.fragment_index, 2);
        assert_eq!(h.fragment_count, 3);
        assert_eq!(h.message_length, 16);
        assert_eq!(h.identifier, 5);
        assert_eq!(h.conversation_index, 1);
        assert_eq!(h.channel_code, 2);
        assert!(!h.expects_reply);
        assert!(h.is_last_fragment());
    }

    #[test]
    fn reply_flag_only_true_for_one() {
        let mut wire = BytesMut::new();
        sample_header().encode(&mut wire);
        wire[28] = 2;
        assert!(!FrameHeader::parse(&wire).unwrap().expects_reply);
    }

    #[test]
    fn bad_magic() {
        let mut wire = BytesMut::new();
        sample_header().encode(&mut wire);
        wire[0] = 0x00;
        let err = FrameHeader::parse(&wire).unwrap_err();
        assert!(matches!(err, FrameError::BadMagic { found: 0x005B_3D1F }));
        assert!(err.is_desync());
    }

    #[test]
    fn bad_header_length() {
        let mut wire = BytesMut::new();
        sample_header().encode(&mut wire);
        wire[4] = 16;
        let err = FrameHeader::parse(&wire).unwrap_err();
        assert!(matches!(err, FrameError::BadHeaderLength { found: 16 }));
    }

    #[test]
    fn short_buffer_is_incomplete() {
        let err = FrameHeader::parse(&[0x79, 0x5B, 0x3D, 0x1F]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::IncompleteData {
                needed: HEADER_SIZE,
                available: 4
            }
        ));
    }

    #[test]
    fn fragment_predicates() {
        let mut h = sample_header();
        assert!(!h.is_fragment());
        assert!(!h.is_first_fragment());
        assert!(!h.is_last_fragment());

        h.fragment_count = 3;
        assert!(h.is_first_fragment());
        assert!(!h.is_last_fragment());

        h.fragment_index = 1;
        assert!(!h.is_first_fragment());
        assert!(!h.is_last_fragment());

        h.fragment_index = 2;
        assert!(h.is_last_fragment());

        h.fragment_index = 5;
        assert!(!h.is_last_fragment());
    }

    #[test]
    fn payload_header_derived_values() {
        let ph = PayloadHeader {
            message_type: 2,
            auxiliary_length: 40,
            total_payload_length: 40,
            flags: 0,
        };
        assert!(ph.has_auxiliary());
        assert_eq!(ph.payload_length(), 0);
        assert!(!ph.has_payload());

        let ph = PayloadHeader {
            auxiliary_length: 0,
            total_payload_length: 12,
            ..ph
        };
        assert!(!ph.has_auxiliary());
        assert!(ph.has_payload());
    }

    #[test]
    fn payload_and_auxiliary_headers_parse_at_offset() {
        let mut wire = BytesMut::new();
        wire.put_slice(&[0xAA; 4]);
        PayloadHeader {
            message_type: 3,
            auxiliary_length: 20,
            total_payload_length: 30,
            flags: -1,
        }
        .encode(&mut wire);
        AuxiliaryHeader {
            buffer_size: 496,
            reserved0: 0,
            auxiliary_size: 4,
            reserved1: 0,
        }
        .encode(&mut wire);

        let ph = PayloadHeader::parse(&wire, 4).unwrap();
        assert_eq!(ph.message_type, 3);
        assert_eq!(ph.flags, -1);

        let ah = AuxiliaryHeader::parse(&wire, 20).unwrap();
        assert_eq!(ah.buffer_size, 496);
        assert_eq!(ah.auxiliary_size, 4);

        assert!(AuxiliaryHeader::parse(&wire, 21).is_err());
    }
}
