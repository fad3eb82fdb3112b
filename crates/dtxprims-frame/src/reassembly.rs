//! Joining fragmented messages.
//!
//! Each identifier is either idle (no entry) or accumulating. A first-fragment
//! marker opens a sequence, continuations append their bodies in index order,
//! and the last continuation closes it by decoding the joined body as one
//! unfragmented message.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};

use crate::codec::MessageDecoder;
use crate::error::{FrameError, Result};
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::message::Message;

/// Upper bound on the buffer reserved up front from a marker's declared length.
const MAX_INITIAL_CAPACITY: usize = 1024 * 1024;

#[derive(Debug)]
struct Accumulating {
    first: FrameHeader,
    next_index: u16,
    body: BytesMut,
}

/// Reassembles fragment sequences, keyed by message identifier.
#[derive(Debug, Default)]
pub struct Reassembler {
    decoder: MessageDecoder,
    pending: HashMap<u32, Accumulating>,
}

impl Reassembler {
    pub fn new(decoder: MessageDecoder) -> Self {
        Self {
            decoder,
            pending: HashMap::new(),
        }
    }

    /// Feed one decoded frame.
    ///
    /// Unfragmented messages pass straight through. Markers and middle
    /// fragments return `Ok(None)`. The last fragment returns the reassembled
    /// message.
    pub fn push(&mut self, message: Message) -> Result<Option<Message>> {
        if !message.is_fragment() {
            return Ok(Some(message));
        }
        if message.is_first_fragment() {
            self.open(message.header)?;
            return Ok(None);
        }

        let identifier = message.identifier();
        let index = message.fragment_index();
        let Some(seq) = self.pending.get_mut(&identifier) else {
            return Err(FrameError::OrphanFragment { identifier, index });
        };

        if seq.first.fragment_count != message.fragment_count() {
            self.pending.remove(&identifier);
            return Err(FrameError::OrphanFragment { identifier, index });
        }
        if index != seq.next_index {
            let expected = seq.next_index;
            self.pending.remove(&identifier);
            return Err(FrameError::FragmentOutOfOrder {
                identifier,
                expected,
                found: index,
            });
        }

        let max = self.decoder.config().max_message_length;
        let size = seq.body.len() + message.fragment_bytes().len();
        if size > max {
            self.pending.remove(&identifier);
            return Err(FrameError::MessageTooLarge { size, max });
        }

        seq.body.put_slice(message.fragment_bytes());
        seq.next_index += 1;
        debug!(identifier, index, accumulated = seq.body.len(), "fragment appended");

        if !message.is_last_fragment() {
            return Ok(None);
        }

        match self.pending.remove(&identifier) {
            Some(seq) => self.complete(seq).map(Some),
            None => Ok(None),
        }
    }

    /// Number of identifiers with an open sequence.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether a sequence is open for `identifier`.
    pub fn is_pending(&self, identifier: u32) -> bool {
        self.pending.contains_key(&identifier)
    }

    /// Drop every open sequence.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn decoder(&self) -> &MessageDecoder {
        &self.decoder
    }

    fn open(&mut self, first: FrameHeader) -> Result<()> {
        let identifier = first.identifier;
        if let Some(abandoned) = self.pending.remove(&identifier) {
            warn!(
                identifier,
                received = abandoned.next_index - 1,
                fragments = abandoned.first.fragment_count,
                "new first fragment abandons open sequence"
            );
        }

        let max = self.decoder.config().max_pending_sequences;
        if self.pending.len() >= max {
            return Err(FrameError::TooManySequences { max });
        }

        debug!(
            identifier,
            fragments = first.fragment_count,
            "fragment sequence opened"
        );
        self.pending.insert(
            identifier,
            Accumulating {
                first,
                next_index: 1,
                body: BytesMut::with_capacity(first.body_len().min(MAX_INITIAL_CAPACITY)),
            },
        );
        Ok(())
    }

    fn complete(&self, seq: Accumulating) -> Result<Message> {
        let header = FrameHeader {
            fragment_index: 0,
            fragment_count: 1,
            message_length: seq.body.len() as u32,
            ..seq.first
        };
        let mut wire = BytesMut::with_capacity(HEADER_SIZE + seq.body.len());
        header.encode(&mut wire);
        wire.put_slice(&seq.body);

        let (message, _) = self.decoder.decode(wire.freeze())?;
        debug!(message = %message, "fragment sequence reassembled");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::codec::{
        decode_message, encode_fragmented, encode_message, DecoderConfig, OutgoingMessage,
    };
    use crate::delegate::Object;

    fn outgoing(identifier: u32, payload: Vec<u8>) -> OutgoingMessage {
        OutgoingMessage {
            identifier,
            conversation_index: 0,
            channel_code: 3,
            expects_reply: false,
            message_type: 2,
            flags: 0,
            auxiliary: Bytes::from_static(b"\x01\x02\x03\x04"),
            payload: Bytes::from(payload),
        }
    }

    fn frames(message: &OutgoingMessage, max_fragment_body: usize) -> Vec<Message> {
        let mut wire = BytesMut::new();
        encode_fragmented(message, max_fragment_body, &mut wire).unwrap();
        let mut rest = wire.freeze();
        let mut out = Vec::new();
        while !rest.is_empty() {
            let (msg, next) = decode_message(rest).unwrap();
            out.push(msg);
            rest = next;
        }
        out
    }

    #[test]
    fn three_fragment_sequence_reassembles() {
        // 16 (payload header) + 20 (aux) + 14 (payload) = 50 byte body, two continuations
        let message = outgoing(7, vec![0x5A; 14]);
        let parts = frames(&message, 25);
        assert_eq!(parts.len(), 3);
        assert!(parts[0].is_first_fragment());
        assert_eq!(parts[0].fragment_count(), 3);

        let mut reassembler = Reassembler::default();
        assert!(reassembler.push(parts[0].clone()).unwrap().is_none());
        assert!(reassembler.is_pending(7));
        assert!(reassembler.push(parts[1].clone()).unwrap().is_none());
        let joined = reassembler.push(parts[2].clone()).unwrap().unwrap();

        assert_eq!(joined.identifier(), 7);
        assert!(!joined.is_fragment());
        assert!(joined.fragment_bytes().is_empty());
        assert_eq!(joined.payload(), &[Object::from(hex::encode([0x5A; 14]))]);
        assert_eq!(joined.auxiliary().entries(), &[Object::from("01020304")]);
        assert_eq!(reassembler.pending(), 0);

        let mut direct = BytesMut::new();
        encode_message(&message, &mut direct).unwrap();
        assert_eq!(joined.raw_bytes(), &direct.freeze());
    }

    #[test]
    fn unfragmented_passes_through() {
        let parts = frames(&outgoing(1, vec![1, 2, 3]), 1024);
        let mut reassembler = Reassembler::default();
        let out = reassembler.push(parts[0].clone()).unwrap().unwrap();
        assert_eq!(out.identifier(), 1);
    }

    #[test]
    fn interleaved_identifiers() {
        let a = frames(&outgoing(10, vec![0xAA; 30]), 20);
        let b = frames(&outgoing(11, vec![0xBB; 30]), 20);
        assert_eq!(a.len(), b.len());

        let mut reassembler = Reassembler::default();
        let mut done = Vec::new();
        for (fa, fb) in a.into_iter().zip(b) {
            done.extend(reassembler.push(fa).unwrap());
            done.extend(reassembler.push(fb).unwrap());
        }

        let ids: Vec<u32> = done.iter().map(Message::identifier).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn continuation_without_marker_is_orphan() {
        let parts = frames(&outgoing(4, vec![0; 40]), 16);
        let mut reassembler = Reassembler::default();
        let err = reassembler.push(parts[1].clone()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::OrphanFragment {
                identifier: 4,
                index: 1
            }
        ));
    }

    #[test]
    fn skipped_fragment_is_out_of_order() {
        let parts = frames(&outgoing(4, vec![0; 40]), 16);
        assert!(parts.len() > 3);
        let mut reassembler = Reassembler::default();
        reassembler.push(parts[0].clone()).unwrap();
        let err = reassembler.push(parts[2].clone()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FragmentOutOfOrder {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert!(!reassembler.is_pending(4));
    }

    #[test]
    fn new_marker_restarts_sequence() {
        let parts = frames(&outgoing(9, vec![0x11; 40]), 16);
        let mut reassembler = Reassembler::default();
        reassembler.push(parts[0].clone()).unwrap();
        reassembler.push(parts[1].clone()).unwrap();

        let mut last = None;
        for part in parts {
            last = reassembler.push(part).unwrap();
        }
        assert_eq!(last.unwrap().identifier(), 9);
    }

    #[test]
    fn fragment_count_mismatch_closes_sequence() {
        let parts = frames(&outgoing(2, vec![0; 40]), 16);
        let mut reassembler = Reassembler::default();
        reassembler.push(parts[0].clone()).unwrap();

        let mut stray = parts[1].clone();
        stray.header.fragment_count += 1;
        let err = reassembler.push(stray).unwrap_err();
        assert!(matches!(
            err,
            FrameError::OrphanFragment {
                identifier: 2,
                index: 1
            }
        ));
        assert!(!reassembler.is_pending(2));
    }

    #[test]
    fn accumulated_body_over_limit() {
        // 16 + 20 + 20 = 56 byte body in 16 byte pieces
        let parts = frames(&outgoing(6, vec![0; 20]), 16);
        let cfg = DecoderConfig {
            max_message_length: 20,
            ..DecoderConfig::default()
        };
        let mut reassembler = Reassembler::new(MessageDecoder::with_config(cfg));
        reassembler.push(parts[0].clone()).unwrap();
        assert!(reassembler.push(parts[1].clone()).unwrap().is_none());

        let err = reassembler.push(parts[2].clone()).unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLarge { size: 32, max: 20 }));
        assert!(!reassembler.is_pending(6));
    }

    #[test]
    fn pending_sequence_limit() {
        let cfg = DecoderConfig {
            max_pending_sequences: 1,
            ..DecoderConfig::default()
        };
        let mut reassembler = Reassembler::new(MessageDecoder::with_config(cfg));
        let a = frames(&outgoing(1, vec![0; 40]), 16);
        let b = frames(&outgoing(2, vec![0; 40]), 16);

        reassembler.push(a[0].clone()).unwrap();
        let err = reassembler.push(b[0].clone()).unwrap_err();
        assert!(matches!(err, FrameError::TooManySequences { max: 1 }));
    }
}
