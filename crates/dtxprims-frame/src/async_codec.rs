//! `tokio_util` codec for DTX streams (requires the `async` feature).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_fragmented, encode_message, frame_len, MessageDecoder, OutgoingMessage};
use crate::error::{FrameError, Result};
use crate::header::HEADER_SIZE;
use crate::message::Message;
use crate::reassembly::Reassembler;

/// Frames, decodes and reassembles DTX messages for `FramedRead`/`FramedWrite`.
#[derive(Debug, Default)]
pub struct DtxCodec {
    reassembler: Reassembler,
    max_fragment_body: Option<usize>,
}

impl DtxCodec {
    pub fn new(decoder: MessageDecoder) -> Self {
        Self {
            reassembler: Reassembler::new(decoder),
            max_fragment_body: None,
        }
    }

    /// Split outgoing bodies larger than `max_fragment_body`.
    pub fn with_max_fragment_body(mut self, max_fragment_body: usize) -> Self {
        self.max_fragment_body = Some(max_fragment_body);
        self
    }
}

impl Decoder for DtxCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        loop {
            let Some(len) = frame_len(src, self.reassembler.decoder().config())? else {
                src.reserve(HEADER_SIZE);
                return Ok(None);
            };
            let frame = src.split_to(len).freeze();
            let (message, _) = self.reassembler.decoder().decode(frame)?;
            if let Some(message) = self.reassembler.push(message)? {
                return Ok(Some(message));
            }
        }
    }
}

impl Encoder<OutgoingMessage> for DtxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: OutgoingMessage, dst: &mut BytesMut) -> Result<()> {
        match self.max_fragment_body {
            Some(max) => encode_fragmented(&item, max, dst).map(|_| ()),
            None => encode_message(&item, dst),
        }
    }
}
