//! Preservation of unrecognized wire data.
//!
//! Fields decoded with a number (or wire type) the current schema does not
//! declare are never an error: their raw payloads are captured here, carried
//! through the builder into the built message, and re-emitted verbatim so
//! that re-serialized messages stay forward compatible with newer schemas.

use alloc::vec::Vec;

use bytes::{Buf, BufMut};

use crate::encoding::{
    encode_key, encode_length_delimited, encode_varint, encoded_len_length_delimited,
    encoded_len_varint, key_len, Capped, WireType,
};
use crate::DecodeError;
use crate::DecodeErrorKind::Truncated;

/// One unrecognized field value, preserving the exact payload shape it was
/// decoded with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnknownValue {
    Varint(u64),
    SixtyFourBit([u8; 8]),
    LengthDelimited(Vec<u8>),
    ThirtyTwoBit([u8; 4]),
}

impl UnknownValue {
    /// The wire type this value was decoded with and will re-encode with.
    pub fn wire_type(&self) -> WireType {
        match self {
            UnknownValue::Varint(_) => WireType::Varint,
            UnknownValue::SixtyFourBit(_) => WireType::SixtyFourBit,
            UnknownValue::LengthDelimited(_) => WireType::LengthDelimited,
            UnknownValue::ThirtyTwoBit(_) => WireType::ThirtyTwoBit,
        }
    }

    pub(crate) fn decode<B: Buf + ?Sized>(
        wire_type: WireType,
        buf: &mut Capped<B>,
    ) -> Result<Self, DecodeError> {
        Ok(match wire_type {
            WireType::Varint => {
                let value = buf.decode_varint()?;
                if buf.has_overrun() {
                    return Err(DecodeError::new(Truncated));
                }
                UnknownValue::Varint(value)
            }
            WireType::LengthDelimited => {
                let mut value = Vec::new();
                value.put(buf.take_length_delimited()?.take_all());
                UnknownValue::LengthDelimited(value)
            }
            WireType::SixtyFourBit => {
                if buf.remaining_before_cap() < 8 {
                    return Err(DecodeError::new(Truncated));
                }
                let mut value = [0u8; 8];
                buf.copy_to_slice(&mut value);
                UnknownValue::SixtyFourBit(value)
            }
            WireType::ThirtyTwoBit => {
                if buf.remaining_before_cap() < 4 {
                    return Err(DecodeError::new(Truncated));
                }
                let mut value = [0u8; 4];
                buf.copy_to_slice(&mut value);
                UnknownValue::ThirtyTwoBit(value)
            }
        })
    }

    fn encode<B: BufMut + ?Sized>(&self, buf: &mut B) {
        match self {
            UnknownValue::Varint(value) => encode_varint(*value, buf),
            UnknownValue::SixtyFourBit(value) => buf.put_slice(value),
            UnknownValue::LengthDelimited(value) => encode_length_delimited(value, buf),
            UnknownValue::ThirtyTwoBit(value) => buf.put_slice(value),
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            UnknownValue::Varint(value) => encoded_len_varint(*value),
            UnknownValue::SixtyFourBit(_) => 8,
            UnknownValue::LengthDelimited(value) => encoded_len_length_delimited(value.len()),
            UnknownValue::ThirtyTwoBit(_) => 4,
        }
    }
}

/// The ordered collection of unrecognized fields captured while decoding one
/// message.
///
/// Entries keep their arrival order and re-encode byte-for-byte identically
/// to how they appeared on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnknownFieldSet {
    fields: Vec<(u32, UnknownValue)>,
}

impl UnknownFieldSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates the captured fields in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &(u32, UnknownValue)> {
        self.fields.iter()
    }

    pub(crate) fn push(&mut self, number: u32, value: UnknownValue) {
        self.fields.push((number, value));
    }

    pub(crate) fn extend_from(&mut self, other: &UnknownFieldSet) {
        self.fields.extend(other.fields.iter().cloned());
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }

    pub(crate) fn encode<B: BufMut + ?Sized>(&self, buf: &mut B) {
        for (number, value) in &self.fields {
            encode_key(*number, value.wire_type(), buf);
            value.encode(buf);
        }
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(number, value)| key_len(*number) + value.encoded_len())
            .sum()
    }
}
