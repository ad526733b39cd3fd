#![no_std]
#![doc(html_root_url = "https://docs.rs/wireform/0.1.0")]
#![doc = include_str!("../README.md")]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// Re-export of the bytes crate for use within schema-table code.
pub use bytes;

mod builder;
mod descriptor;
mod error;
mod message;
mod presence;
mod unknown;

pub mod encoding;

pub use crate::builder::Builder;
pub use crate::descriptor::{
    EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, OneofDescriptor,
};
pub use crate::encoding::MAX_FIELD_NUMBER;
pub use crate::error::{BuildError, DecodeError, DecodeErrorKind, EncodeError};
pub use crate::message::Message;
pub use crate::unknown::{UnknownFieldSet, UnknownValue};

use ::bytes::{Buf, BufMut};

use crate::encoding::{decode_varint, encode_varint, encoded_len_varint};

// See `encoding::DecodeContext` for more info.
// 100 is the default recursion limit in the C++ implementation.
const RECURSION_LIMIT: u32 = 100;

/// Encodes a length delimiter to the buffer.
///
/// See [`Message::encode_length_delimited`] for more info.
///
/// An error will be returned if the buffer does not have sufficient capacity
/// to encode the delimiter.
#[inline]
pub fn encode_length_delimiter<B: BufMut>(length: usize, buf: &mut B) -> Result<(), EncodeError> {
    let length = length as u64;
    let required = encoded_len_varint(length);
    let remaining = buf.remaining_mut();
    if required > remaining {
        return Err(EncodeError::new(required, remaining));
    }
    encode_varint(length, buf);
    Ok(())
}

/// Returns the encoded length of a length delimiter.
///
/// Applications may use this method to ensure sufficient buffer capacity
/// before calling `encode_length_delimiter`. The returned size will be
/// between 1 and 10, inclusive.
#[inline(always)]
pub fn length_delimiter_len(length: usize) -> usize {
    encoded_len_varint(length as u64)
}

/// Decodes a length delimiter from the buffer.
///
/// This method allows the length delimiter to be decoded independently of the
/// message, when the message is encoded with
/// [`Message::encode_length_delimited`].
#[inline(always)]
pub fn decode_length_delimiter<B: Buf>(mut buf: B) -> Result<usize, DecodeError> {
    decode_varint(&mut buf)?
        .try_into()
        .map_err(|_| DecodeError::new(DecodeErrorKind::Oversize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn length_delimiter_roundtrip() {
        let mut buf = Vec::new();
        encode_length_delimiter(70_000, &mut buf).unwrap();
        assert_eq!(buf.len(), length_delimiter_len(70_000));
        assert_eq!(decode_length_delimiter(buf.as_slice()).unwrap(), 70_000);
    }

    #[test]
    fn length_delimiter_rejects_short_buffers() {
        let mut buf = [0u8; 1];
        let err = encode_length_delimiter(70_000, &mut buf.as_mut_slice()).unwrap_err();
        assert_eq!(err.required_capacity(), 3);
        assert_eq!(err.remaining(), 1);
    }
}
