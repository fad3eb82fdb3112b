//! Decoding of length-prefixed, fragmentable DTX messages.
//!
//! Every frame starts with a fixed 32-byte header:
//! - A 4-byte big-endian magic (`0x795B3D1F`) for stream synchronization
//! - A 4-byte header length that must be 32
//! - Fragment index and count, body length, identifier, conversation index,
//!   channel code and a reply flag, all little-endian
//!
//! Unfragmented messages continue with a 16-byte payload header, an optional
//! auxiliary section and an optional payload. Large messages are split into a
//! header-only first fragment followed by continuation frames; [`Reassembler`]
//! joins them. Auxiliary and payload bytes are handed to injected decoders.

pub mod codec;
pub mod cursor;
pub mod delegate;
pub mod error;
pub mod header;
pub mod message;
pub mod message_type;
pub mod reader;
pub mod reassembly;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_message, encode_fragmented, encode_message, frame_len, DecoderConfig, MessageDecoder,
    OutgoingMessage, DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_MAX_PENDING_SEQUENCES,
};
pub use delegate::{
    AuxiliaryDecoder, AuxiliaryDictionary, Object, PayloadDecoder, RawAuxiliaryDecoder,
    RawPayloadDecoder,
};
pub use error::{BoxError, FrameError, Result};
pub use header::{AuxiliaryHeader, FrameHeader, PayloadHeader, HEADER_SIZE, MAGIC};
pub use message::Message;
pub use message_type::{message_type_label, message_type_name};
pub use reader::MessageReader;
pub use reassembly::Reassembler;
pub use writer::MessageWriter;

#[cfg(feature = "async")]
pub use async_codec::DtxCodec;
