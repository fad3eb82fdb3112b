use std::ops::Range;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::cursor::ensure;
use crate::delegate::{
    AuxiliaryDecoder, AuxiliaryDictionary, PayloadDecoder, RawAuxiliaryDecoder, RawPayloadDecoder,
};
use crate::error::{FrameError, Result};
use crate::header::{
    AuxiliaryHeader, FrameHeader, PayloadHeader, AUXILIARY_HEADER_OFFSET, AUXILIARY_HEADER_SIZE,
    HEADER_SIZE, PAYLOAD_HEADER_OFFSET, PAYLOAD_HEADER_SIZE,
};
use crate::message::Message;

/// Default maximum declared body length: 64 MiB.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 64 * 1024 * 1024;

/// Default number of fragmented messages that may be reassembled at once.
pub const DEFAULT_MAX_PENDING_SEQUENCES: usize = 64;

/// Buffer size advertised in the auxiliary header of encoded messages.
pub const AUXILIARY_BUFFER_SIZE: u32 = 496;

/// Configuration for decoding and reassembly.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum declared body length (and reassembled length) in bytes. Default: 64 MiB.
    pub max_message_length: usize,
    /// Maximum number of identifiers with an open fragment sequence. Default: 64.
    pub max_pending_sequences: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            max_pending_sequences: DEFAULT_MAX_PENDING_SEQUENCES,
        }
    }
}

/// Turns raw frames into [`Message`]s.
///
/// Holds the injected auxiliary and payload decoders; cloning is cheap.
#[derive(Clone)]
pub struct MessageDecoder {
    config: DecoderConfig,
    auxiliary: Arc<dyn AuxiliaryDecoder>,
    payload: Arc<dyn PayloadDecoder>,
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDecoder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MessageDecoder {
    /// Decoder with default configuration and pass-through delegates.
    pub fn new() -> Self {
        Self::with_decoders(
            DecoderConfig::default(),
            Arc::new(RawAuxiliaryDecoder),
            Arc::new(RawPayloadDecoder),
        )
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn with_decoders(
        config: DecoderConfig,
        auxiliary: Arc<dyn AuxiliaryDecoder>,
        payload: Arc<dyn PayloadDecoder>,
    ) -> Self {
        Self {
            config,
            auxiliary,
            payload,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode the frame at the start of `src`.
    ///
    /// Returns the message and the bytes after it. Feed the remainder back in
    /// to walk a stream of back-to-back frames. Fragments come back as markers
    /// or continuations; see [`crate::Reassembler`] to join them.
    pub fn decode(&self, src: Bytes) -> Result<(Message, Bytes)> {
        let header = FrameHeader::parse(&src)?;
        self.check_length(header.body_len())?;

        if header.is_first_fragment() {
            debug!(
                identifier = header.identifier,
                fragments = header.fragment_count,
                total_length = header.message_length,
                "first fragment marker"
            );
            let raw = src.slice(..HEADER_SIZE);
            return Ok((Message::fragment_marker(header, raw), src.slice(HEADER_SIZE..)));
        }

        let total = frame_total(&header)?;
        ensure(&src, total)?;
        let raw = src.slice(..total);
        let rest = src.slice(total..);

        if header.is_fragment() {
            debug!(
                identifier = header.identifier,
                index = header.fragment_index,
                fragments = header.fragment_count,
                length = header.message_length,
                "fragment continuation"
            );
            let body = raw.slice(HEADER_SIZE..);
            return Ok((Message::continuation(header, raw, body), rest));
        }

        let message = self.decode_unfragmented(header, raw)?;
        debug!(message = %message, "decoded message");
        Ok((message, rest))
    }

    fn decode_unfragmented(&self, header: FrameHeader, raw: Bytes) -> Result<Message> {
        let payload_header = PayloadHeader::parse(&raw, PAYLOAD_HEADER_OFFSET)?;

        let mut auxiliary_header = None;
        let mut auxiliary = AuxiliaryDictionary::default();
        if payload_header.has_auxiliary() {
            auxiliary_header = Some(AuxiliaryHeader::parse(&raw, AUXILIARY_HEADER_OFFSET)?);
            let range = region(
                "auxiliary",
                (AUXILIARY_HEADER_OFFSET + AUXILIARY_HEADER_SIZE) as i64,
                AUXILIARY_HEADER_OFFSET as i64 + i64::from(payload_header.auxiliary_length),
                raw.len(),
            )?;
            auxiliary = self
                .auxiliary
                .decode_auxiliary(&raw[range])
                .map_err(FrameError::Auxiliary)?;
        }

        let mut payload = Vec::new();
        if payload_header.has_payload() {
            let start = if payload_header.has_auxiliary() {
                AUXILIARY_HEADER_OFFSET as i64 + i64::from(payload_header.auxiliary_length)
            } else {
                AUXILIARY_HEADER_OFFSET as i64
            };
            let range = region("payload", start, raw.len() as i64, raw.len())?;
            payload = self
                .payload
                .decode_payload(&raw[range])
                .map_err(FrameError::Payload)?;
        }

        Ok(Message {
            header,
            payload_header: Some(payload_header),
            auxiliary_header,
            auxiliary,
            payload,
            raw_bytes: raw,
            fragment_bytes: Bytes::new(),
        })
    }

    fn check_length(&self, size: usize) -> Result<()> {
        if size > self.config.max_message_length {
            return Err(FrameError::MessageTooLarge {
                size,
                max: self.config.max_message_length,
            });
        }
        Ok(())
    }
}

/// Decode one frame with the pass-through delegates and default limits.
pub fn decode_message(src: Bytes) -> Result<(Message, Bytes)> {
    MessageDecoder::new().decode(src)
}

/// Number of bytes the frame at the start of `src` occupies.
///
/// Returns `Ok(None)` if `src` doesn't hold the whole frame yet. The header is
/// validated as soon as it is available, so a desynchronized stream fails
/// before any body bytes arrive.
pub fn frame_len(src: &[u8], config: &DecoderConfig) -> Result<Option<usize>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }
    let header = FrameHeader::parse(src)?;
    if header.body_len() > config.max_message_length {
        return Err(FrameError::MessageTooLarge {
            size: header.body_len(),
            max: config.max_message_length,
        });
    }
    let total = if header.is_first_fragment() {
        HEADER_SIZE
    } else {
        frame_total(&header)?
    };
    if src.len() < total {
        return Ok(None);
    }
    Ok(Some(total))
}

fn frame_total(header: &FrameHeader) -> Result<usize> {
    HEADER_SIZE
        .checked_add(header.body_len())
        .ok_or(FrameError::MessageTooLarge {
            size: header.body_len(),
            max: usize::MAX - HEADER_SIZE,
        })
}

/// Validate a `[start, end)` range computed from the payload header.
fn region(name: &'static str, start: i64, end: i64, len: usize) -> Result<Range<usize>> {
    trace!(region = name, start, end, len, "locating region");
    if start < 0 || end < start {
        return Err(FrameError::MalformedRegion {
            region: name,
            start,
            end,
        });
    }
    let (start, end) = (start as usize, end as usize);
    if end > len {
        return Err(FrameError::IncompleteData {
            needed: end,
            available: len,
        });
    }
    Ok(start..end)
}

/// A message to put on the wire.
///
/// `auxiliary` and `payload` are already-encoded bytes; this crate only frames them.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub identifier: u32,
    pub conversation_index: u32,
    pub channel_code: u32,
    pub expects_reply: bool,
    pub message_type: i32,
    pub flags: i32,
    /// Encoded auxiliary dictionary, without its 16-byte header.
    pub auxiliary: Bytes,
    /// Encoded payload archive.
    pub payload: Bytes,
}

impl OutgoingMessage {
    fn header(&self, body_len: u32) -> FrameHeader {
        FrameHeader {
            fragment_index: 0,
            fragment_count: 1,
            message_length: body_len,
            identifier: self.identifier,
            conversation_index: self.conversation_index,
            channel_code: self.channel_code,
            expects_reply: self.expects_reply,
        }
    }

    /// Payload header, optional auxiliary section and payload.
    fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        let auxiliary_length = if self.auxiliary.is_empty() {
            0
        } else {
            AUXILIARY_HEADER_SIZE + self.auxiliary.len()
        };
        let total_payload_length = auxiliary_length + self.payload.len();
        let too_large = || FrameError::MessageTooLarge {
            size: PAYLOAD_HEADER_SIZE + total_payload_length,
            max: i32::MAX as usize + PAYLOAD_HEADER_SIZE,
        };
        let aux_len = i32::try_from(auxiliary_length).map_err(|_| too_large())?;
        let total_len = i32::try_from(total_payload_length).map_err(|_| too_large())?;

        dst.reserve(PAYLOAD_HEADER_SIZE + total_payload_length);
        PayloadHeader {
            message_type: self.message_type,
            auxiliary_length: aux_len,
            total_payload_length: total_len,
            flags: self.flags,
        }
        .encode(dst);

        if !self.auxiliary.is_empty() {
            AuxiliaryHeader {
                buffer_size: AUXILIARY_BUFFER_SIZE.max(self.auxiliary.len() as u32),
                reserved0: 0,
                auxiliary_size: self.auxiliary.len() as u32,
                reserved1: 0,
            }
            .encode(dst);
            dst.put_slice(&self.auxiliary);
        }
        dst.put_slice(&self.payload);
        Ok(())
    }
}

/// Encode an unfragmented message.
///
/// Wire format:
/// ```text
/// ┌──────────────┬────────────────┬─────────────────────────┬──────────────┐
/// │ Frame header │ Payload header │ Aux header + dictionary │ Payload      │
/// │ (32B)        │ (16B)          │ (16B + N, optional)     │ (M bytes)    │
/// └──────────────┴────────────────┴─────────────────────────┴──────────────┘
/// ```
pub fn encode_message(message: &OutgoingMessage, dst: &mut BytesMut) -> Result<()> {
    let mut body = BytesMut::new();
    message.encode_body(&mut body)?;
    message.header(body.len() as u32).encode(dst);
    dst.put_slice(&body);
    Ok(())
}

/// Encode a message, splitting it when its body exceeds `max_fragment_body`.
///
/// A split message is a 32-byte first-fragment marker carrying the total body
/// length, followed by continuations whose bodies concatenate to that body.
/// Returns the number of frames written.
pub fn encode_fragmented(
    message: &OutgoingMessage,
    max_fragment_body: usize,
    dst: &mut BytesMut,
) -> Result<usize> {
    let max_fragment_body = max_fragment_body.max(1);
    let mut body = BytesMut::new();
    message.encode_body(&mut body)?;

    if body.len() <= max_fragment_body {
        message.header(body.len() as u32).encode(dst);
        dst.put_slice(&body);
        return Ok(1);
    }

    let chunks = body.len().div_ceil(max_fragment_body);
    let fragment_count = u16::try_from(chunks + 1).map_err(|_| FrameError::MessageTooLarge {
        size: body.len(),
        max: max_fragment_body * (u16::MAX as usize - 1),
    })?;

    let marker = FrameHeader {
        fragment_count,
        ..message.header(body.len() as u32)
    };
    dst.reserve(HEADER_SIZE * (chunks + 1) + body.len());
    marker.encode(dst);

    for (i, chunk) in body.chunks(max_fragment_body).enumerate() {
        FrameHeader {
            fragment_index: i as u16 + 1,
            message_length: chunk.len() as u32,
            ..marker
        }
        .encode(dst);
        dst.put_slice(chunk);
    }

    Ok(chunks + 1)
}
