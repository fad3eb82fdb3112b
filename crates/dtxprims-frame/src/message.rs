use std::fmt;

use bytes::Bytes;

use crate::delegate::{AuxiliaryDictionary, Object};
use crate::header::{AuxiliaryHeader, FrameHeader, PayloadHeader};
use crate::message_type::{message_type_label, ACK};

/// One decoded DTX protocol unit.
///
/// Built once by the decoder and never mutated. Byte fields are slices of the
/// buffer handed to the decoder and keep it alive for as long as the message.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) header: FrameHeader,
    pub(crate) payload_header: Option<PayloadHeader>,
    pub(crate) auxiliary_header: Option<AuxiliaryHeader>,
    pub(crate) auxiliary: AuxiliaryDictionary,
    pub(crate) payload: Vec<Object>,
    pub(crate) raw_bytes: Bytes,
    pub(crate) fragment_bytes: Bytes,
}

impl Message {
    pub(crate) fn fragment_marker(header: FrameHeader, raw_bytes: Bytes) -> Self {
        Self {
            header,
            payload_header: None,
            auxiliary_header: None,
            auxiliary: AuxiliaryDictionary::default(),
            payload: Vec::new(),
            raw_bytes,
            fragment_bytes: Bytes::new(),
        }
    }

    pub(crate) fn continuation(
        header: FrameHeader,
        raw_bytes: Bytes,
        fragment_bytes: Bytes,
    ) -> Self {
        Self {
            fragment_bytes,
            ..Self::fragment_marker(header, raw_bytes)
        }
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn fragment_index(&self) -> u16 {
        self.header.fragment_index
    }

    pub fn fragment_count(&self) -> u16 {
        self.header.fragment_count
    }

    pub fn message_length(&self) -> u32 {
        self.header.message_length
    }

    pub fn identifier(&self) -> u32 {
        self.header.identifier
    }

    pub fn conversation_index(&self) -> u32 {
        self.header.conversation_index
    }

    pub fn channel_code(&self) -> u32 {
        self.header.channel_code
    }

    pub fn expects_reply(&self) -> bool {
        self.header.expects_reply
    }

    /// Present only on unfragmented messages.
    pub fn payload_header(&self) -> Option<&PayloadHeader> {
        self.payload_header.as_ref()
    }

    pub fn message_type(&self) -> Option<i32> {
        self.payload_header.map(|ph| ph.message_type)
    }

    /// Present only when the message carries an auxiliary section.
    pub fn auxiliary_header(&self) -> Option<&AuxiliaryHeader> {
        self.auxiliary_header.as_ref()
    }

    /// Empty when the message has no auxiliary section.
    pub fn auxiliary(&self) -> &AuxiliaryDictionary {
        &self.auxiliary
    }

    /// Decoded payload objects, in archive order.
    pub fn payload(&self) -> &[Object] {
        &self.payload
    }

    /// Every byte of this frame, header included.
    pub fn raw_bytes(&self) -> &Bytes {
        &self.raw_bytes
    }

    /// Body of a continuation fragment. Empty for every other kind of message.
    pub fn fragment_bytes(&self) -> &Bytes {
        &self.fragment_bytes
    }

    pub fn has_auxiliary(&self) -> bool {
        self.payload_header.is_some_and(|ph| ph.has_auxiliary())
    }

    pub fn has_payload(&self) -> bool {
        self.payload_header.is_some_and(|ph| ph.has_payload())
    }

    pub fn payload_length(&self) -> i32 {
        self.payload_header.map_or(0, |ph| ph.payload_length())
    }

    pub fn is_fragment(&self) -> bool {
        self.header.is_fragment()
    }

    pub fn is_first_fragment(&self) -> bool {
        self.header.is_first_fragment()
    }

    pub fn is_last_fragment(&self) -> bool {
        self.header.is_last_fragment()
    }

    /// Whether `other` is a later fragment of the sequence this marker opens.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a first-fragment marker.
    pub fn is_first_fragment_for(&self, other: &Message) -> bool {
        assert!(
            self.is_first_fragment(),
            "is_first_fragment_for called on a message that is not a first-fragment marker"
        );
        self.identifier() == other.identifier()
            && self.fragment_count() == other.fragment_count()
            && other.fragment_index() > 0
    }

    /// Multi-line rendering with auxiliary, first payload object and raw bytes.
    pub fn to_debug_string(&self) -> String {
        if self.message_type() == Some(ACK) {
            return self.to_string();
        }
        let payload = match self.payload.first() {
            Some(first) if self.has_payload() => {
                serde_json::to_string(first).unwrap_or_else(|_| "<unprintable>".to_string())
            }
            _ => "none".to_string(),
        };
        let raw = hex::encode(&self.raw_bytes);
        match self.auxiliary_header {
            Some(aux_header) if self.has_auxiliary() => format!(
                "{self}\nauxiliary_header: {aux_header}\nauxiliary: {}\npayload: {payload}\nraw: {raw}",
                self.auxiliary
            ),
            _ => format!("{self}\nauxiliary: none\npayload: {payload}\nraw: {raw}"),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reply = if self.expects_reply() { "e" } else { "" };
        write!(
            f,
            "i{}.{}{} c{} ",
            self.identifier(),
            self.conversation_index(),
            reply,
            self.channel_code()
        )?;

        match self.payload_header {
            Some(ph) => write!(
                f,
                "t:{} mlen:{} aux_len:{} paylen:{}",
                message_type_label(ph.message_type),
                self.message_length(),
                ph.auxiliary_length,
                ph.payload_length()
            ),
            None => write!(
                f,
                "fragment {}/{} mlen:{}",
                self.fragment_index(),
                self.fragment_count(),
                self.message_length()
            ),
        }
    }
}
