//! Seams to the decoders this crate does not implement.
//!
//! The auxiliary section is a typed primitive dictionary and the payload is a
//! keyed archive. Both formats are decoded elsewhere; the core only hands them
//! the right byte range. [`RawAuxiliaryDecoder`] and [`RawPayloadDecoder`] are
//! pass-through stand-ins that keep the bytes visible as hex.

use std::fmt;

use serde::Serialize;

use crate::error::BoxError;

/// One decoded payload object. Its shape is owned by the payload decoder.
pub type Object = serde_json::Value;

/// Decoded auxiliary dictionary. Entries stay in wire order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuxiliaryDictionary {
    entries: Vec<Object>,
}

impl AuxiliaryDictionary {
    pub fn new(entries: Vec<Object>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Object] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AuxiliaryDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        f.write_str("]")
    }
}

/// Decodes the bytes after the 16-byte auxiliary header.
pub trait AuxiliaryDecoder: Send + Sync {
    fn decode_auxiliary(&self, bytes: &[u8]) -> Result<AuxiliaryDictionary, BoxError>;
}

/// Decodes the payload region into an ordered list of objects.
pub trait PayloadDecoder: Send + Sync {
    fn decode_payload(&self, bytes: &[u8]) -> Result<Vec<Object>, BoxError>;
}

/// Keeps the auxiliary bytes as a single hex string entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawAuxiliaryDecoder;

impl AuxiliaryDecoder for RawAuxiliaryDecoder {
    fn decode_auxiliary(&self, bytes: &[u8]) -> Result<AuxiliaryDictionary, BoxError> {
        if bytes.is_empty() {
            return Ok(AuxiliaryDictionary::default());
        }
        Ok(AuxiliaryDictionary::new(vec![Object::String(hex::encode(
            bytes,
        ))]))
    }
}

/// Keeps the payload bytes as a single hex string object.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPayloadDecoder;

impl PayloadDecoder for RawPayloadDecoder {
    fn decode_payload(&self, bytes: &[u8]) -> Result<Vec<Object>, BoxError> {
        Ok(vec![Object::String(hex::encode(bytes))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_payload_is_hex() {
        let out = RawPayloadDecoder.decode_payload(&[0xDE, 0xAD]).unwrap();
        assert_eq!(out, vec![Object::String("dead".into())]);
    }

    #[test]
    fn raw_auxiliary_empty_input_is_empty_dictionary() {
        let dict = RawAuxiliaryDecoder.decode_auxiliary(&[]).unwrap();
        assert!(dict.is_empty());
    }

    #[test]
    fn dictionary_display() {
        let dict = AuxiliaryDictionary::new(vec![Object::from(1), Object::from("x")]);
        assert_eq!(dict.to_string(), "[1, \"x\"]");
    }
}
