//! Utility functions and types for reading and writing the binary wire
//! format: varints, field keys, and cap-bounded buffer cursors.
//!
//! [`Builder`](crate::Builder) and [`Message`](crate::Message) are built on
//! top of these primitives; they are exported for code that needs to frame or
//! inspect wire data directly.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use ::bytes::buf::Take;
use ::bytes::{Buf, BufMut};

use crate::DecodeError;
use crate::DecodeErrorKind::{
    InvalidTag, MalformedVarint, Oversize, RecursionLimitReached, Truncated, UnsupportedWireType,
};

/// The largest permitted field number, `2^29 - 1`. Field keys reserve the low
/// three bits of the key varint for the wire type.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Encodes an integer value into LEB128 variable length format, and writes it
/// to the buffer. The buffer must have enough remaining space (maximum 10
/// bytes).
#[inline]
pub fn encode_varint<B: BufMut + ?Sized>(mut value: u64, buf: &mut B) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            break;
        }
        buf.put_u8(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }
}

/// Returns the encoded length of the value in LEB128 variable length format.
/// The returned value will be between 1 and 10, inclusive.
#[inline]
pub fn encoded_len_varint(value: u64) -> usize {
    // Each byte carries 7 bits; the expression below computes
    // 1 + bits_used / 7 without a branch per byte.
    ((((value | 1).leading_zeros() ^ 63) * 9 + 73) / 64) as usize
}

/// Decodes a LEB128-encoded variable length integer from the buffer.
///
/// Consumption is bounded: a varint that has not terminated after 10 bytes,
/// or whose 10th byte carries bits beyond the 64th, fails with
/// `MalformedVarint`, as does a buffer that ends before the terminating byte.
#[inline]
pub fn decode_varint<B: Buf + ?Sized>(buf: &mut B) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for count in 0..10 {
        if !buf.has_remaining() {
            return Err(DecodeError::new(MalformedVarint));
        }
        let byte = buf.get_u8();
        if count == 9 && byte > 1 {
            // Bits 64.. are spoken for; a continuation bit here would also
            // obligate an 11th byte.
            return Err(DecodeError::new(MalformedVarint));
        }
        value |= u64::from(byte & 0x7F) << (count * 7);
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(DecodeError::new(MalformedVarint))
}

/// Zig-zag encodes a signed integer, storing the sign bit in the least
/// significant bit so that small magnitudes of either sign stay small on the
/// wire.
#[inline]
pub fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`encode_zigzag64`].
#[inline]
pub fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

/// The payload shape selector carried in the low three bits of every field
/// key.
///
/// Wire types 3 and 4 are the deprecated group delimiters and types 6 and 7
/// are reserved; all four fail decoding with `UnsupportedWireType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    SixtyFourBit = 1,
    LengthDelimited = 2,
    ThirtyTwoBit = 5,
}

impl TryFrom<u64> for WireType {
    type Error = DecodeError;

    #[inline]
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::ThirtyTwoBit),
            _ => Err(DecodeError::new(UnsupportedWireType)),
        }
    }
}

/// Encodes the key for the given field number and wire type into the buffer.
#[inline]
pub fn encode_key<B: BufMut + ?Sized>(number: u32, wire_type: WireType, buf: &mut B) {
    debug_assert!((1..=MAX_FIELD_NUMBER).contains(&number));
    encode_varint((u64::from(number) << 3) | wire_type as u64, buf);
}

/// Returns the encoded length of the key for the given field number.
#[inline]
pub fn key_len(number: u32) -> usize {
    encoded_len_varint(u64::from(number) << 3)
}

/// Decodes one field key, returning the field number and wire type.
///
/// Field number zero and numbers beyond [`MAX_FIELD_NUMBER`] fail with
/// `InvalidTag`.
#[inline]
pub fn decode_key<B: Buf + ?Sized>(buf: &mut Capped<B>) -> Result<(u32, WireType), DecodeError> {
    let key = buf.decode_varint()?;
    let wire_type = WireType::try_from(key & 0x7)?;
    let number = key >> 3;
    if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
        return Err(DecodeError::new(InvalidTag));
    }
    Ok((number as u32, wire_type))
}

/// Checks that the expected wire type matches the actual wire type, or
/// returns an error result.
#[inline]
pub fn check_wire_type(expected: WireType, actual: WireType) -> Result<(), DecodeError> {
    if expected != actual {
        return Err(DecodeError::new(UnsupportedWireType));
    }
    Ok(())
}

/// Additional information passed to every decode/merge function.
///
/// The context should be passed by value and can be freely cloned. When
/// passing to a function which is decoding a nested message, use
/// `enter_recursion`.
#[derive(Clone, Debug)]
pub struct DecodeContext {
    /// How many times we can recurse in the current decode stack before we
    /// hit the recursion limit. The limit is `RECURSION_LIMIT` and cannot be
    /// customized.
    recurse_count: u32,
}

impl Default for DecodeContext {
    #[inline]
    fn default() -> DecodeContext {
        DecodeContext {
            recurse_count: crate::RECURSION_LIMIT,
        }
    }
}

impl DecodeContext {
    /// Call this function before recursively decoding a nested message.
    ///
    /// There is no `exit` function: this creates a new `DecodeContext` to be
    /// used at the next level of recursion, while the old context continues
    /// to be used at the current level.
    #[inline]
    pub(crate) fn enter_recursion(&self) -> DecodeContext {
        DecodeContext {
            recurse_count: self.recurse_count - 1,
        }
    }

    /// Checks whether the recursion limit has been reached in the stack of
    /// decodes described by this context.
    #[inline]
    pub(crate) fn limit_reached(&self) -> Result<(), DecodeError> {
        if self.recurse_count == 0 {
            Err(DecodeError::new(RecursionLimitReached))
        } else {
            Ok(())
        }
    }
}

/// A soft-limited wrapper for `impl Buf` that doesn't invoke extra work
/// whenever the buffer is read from, only when the remaining bytes are
/// checked. This means it can be nested arbitrarily (one cap per enclosing
/// length-delimited message) without adding per-read overhead.
#[derive(Debug)]
pub struct Capped<'a, B: 'a + Buf + ?Sized> {
    buf: &'a mut B,
    extra_bytes_remaining: usize,
}

impl<'a, B: 'a + Buf + ?Sized> Capped<'a, B> {
    /// Creates a Capped instance with a cap at the very end of the given
    /// buffer.
    pub fn new(buf: &'a mut B) -> Self {
        Self {
            buf,
            extra_bytes_remaining: 0,
        }
    }

    /// Reads a length delimiter from the beginning of the given buffer, then
    /// returns a Capped instance with its cap at the end of the delimited
    /// range.
    pub fn new_length_delimited(buf: &'a mut B) -> Result<Self, DecodeError> {
        let len = decode_length(buf)?;
        let remaining = buf.remaining();
        if len > remaining {
            return Err(DecodeError::new(Truncated));
        }
        Ok(Self {
            buf,
            extra_bytes_remaining: remaining - len,
        })
    }

    /// Reborrows this cursor, yielding a cursor with the same cap that can be
    /// handed to a callee without giving up ownership.
    pub fn lend(&mut self) -> Capped<'_, B> {
        Capped {
            buf: self.buf,
            extra_bytes_remaining: self.extra_bytes_remaining,
        }
    }

    /// Reads a length delimiter from the current position, then returns a
    /// subsidiary Capped instance for the delineated bytes if it does not
    /// overrun the underlying buffer or this instance's cap.
    pub fn take_length_delimited(&mut self) -> Result<Capped<'_, B>, DecodeError> {
        let len = decode_length(self.buf)?;
        let remaining = self.buf.remaining();
        if len > remaining {
            return Err(DecodeError::new(Truncated));
        }
        let extra_bytes_remaining = remaining - len;
        if extra_bytes_remaining < self.extra_bytes_remaining {
            return Err(DecodeError::new(Truncated));
        }
        Ok(Capped {
            buf: self.buf,
            extra_bytes_remaining,
        })
    }

    #[inline]
    pub fn buf(&mut self) -> &mut B {
        self.buf
    }

    /// Takes the remaining bytes before the cap as a `Take` adapter over the
    /// underlying buffer.
    #[inline]
    pub fn take_all(self) -> Take<&'a mut B> {
        let len = self.remaining_before_cap();
        self.buf.take(len)
    }

    #[inline]
    pub fn decode_varint(&mut self) -> Result<u64, DecodeError> {
        decode_varint(self.buf)
    }

    /// Returns the number of bytes left before the cap.
    #[inline]
    pub fn remaining_before_cap(&self) -> usize {
        self.buf
            .remaining()
            .saturating_sub(self.extra_bytes_remaining)
    }

    /// Returns true if reads have consumed bytes beyond this instance's cap.
    ///
    /// Varint reads are not cap-checked up front; callers detect the overrun
    /// after the fact with this method.
    #[inline]
    pub fn has_overrun(&self) -> bool {
        self.buf.remaining() < self.extra_bytes_remaining
    }
}

impl<'a, B: Buf + ?Sized> Deref for Capped<'a, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.buf
    }
}

impl<'a, B: Buf + ?Sized> DerefMut for Capped<'a, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.buf
    }
}

/// Decodes a length delimiter, converting it to a usize.
fn decode_length<B: Buf + ?Sized>(buf: &mut B) -> Result<usize, DecodeError> {
    usize::try_from(decode_varint(buf)?).map_err(|_| DecodeError::new(Oversize))
}

/// Reads one length-delimited payload from the cursor into an owned byte
/// vector.
pub fn decode_length_delimited<B: Buf + ?Sized>(
    buf: &mut Capped<B>,
) -> Result<Vec<u8>, DecodeError> {
    let delimited = buf.take_length_delimited()?;
    let mut value = Vec::with_capacity(delimited.remaining_before_cap());
    value.put(delimited.take_all());
    Ok(value)
}

/// Reads one length-delimited payload from the cursor as text.
///
/// Invalid UTF-8 is not rejected: bad sequences are replaced rather than
/// failing the decode. The wire contract treats string fields as bytes that
/// are expected, but not guaranteed, to be valid UTF-8.
pub fn decode_string<B: Buf + ?Sized>(buf: &mut Capped<B>) -> Result<String, DecodeError> {
    let bytes = decode_length_delimited(buf)?;
    Ok(match String::from_utf8(bytes) {
        Ok(string) => string,
        Err(invalid) => String::from_utf8_lossy(invalid.as_bytes()).into_owned(),
    })
}

/// Encodes one length-delimited field payload: the length delimiter followed
/// by the bytes.
#[inline]
pub fn encode_length_delimited<B: BufMut + ?Sized>(value: &[u8], buf: &mut B) {
    encode_varint(value.len() as u64, buf);
    buf.put_slice(value);
}

/// Returns the encoded length of a length-delimited payload, including its
/// delimiter.
#[inline]
pub fn encoded_len_length_delimited(len: usize) -> usize {
    encoded_len_varint(len as u64) + len
}

/// Advances the cursor over one field's payload without interpreting it,
/// sized according to the wire type.
pub fn skip_field<B: Buf + ?Sized>(
    wire_type: WireType,
    buf: &mut Capped<B>,
) -> Result<(), DecodeError> {
    let len = match wire_type {
        WireType::Varint => {
            buf.decode_varint()?;
            if buf.has_overrun() {
                return Err(DecodeError::new(Truncated));
            }
            0
        }
        WireType::SixtyFourBit => 8,
        WireType::ThirtyTwoBit => 4,
        WireType::LengthDelimited => {
            let delimited = buf.take_length_delimited()?;
            delimited.remaining_before_cap()
        }
    };
    if len > buf.remaining_before_cap() {
        return Err(DecodeError::new(Truncated));
    }
    buf.advance(len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodeErrorKind;
    use alloc::vec;
    use proptest::prelude::*;

    fn roundtrip_varint(value: u64) -> u64 {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        assert_eq!(buf.len(), encoded_len_varint(value));
        decode_varint(&mut buf.as_slice()).expect("decoding produced an error")
    }

    #[test]
    fn varint_boundaries() {
        for (value, len) in [
            (0u64, 1usize),
            (1, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (0x7FFF_FFFF, 5),
            (u64::from(u32::MAX), 5),
            (u64::MAX - 1, 10),
            (u64::MAX, 10),
        ] {
            assert_eq!(encoded_len_varint(value), len, "len of {}", value);
            assert_eq!(roundtrip_varint(value), value);
        }
    }

    #[test]
    fn varint_rejects_overlong_input() {
        // Ten continuation bytes followed by a terminator: an 11-byte varint.
        let bytes = [
            0x80u8, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01,
        ];
        let err = decode_varint(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedVarint);
    }

    #[test]
    fn varint_rejects_u64_overflow() {
        // The tenth byte may only carry bit 63.
        let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        let err = decode_varint(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedVarint);
    }

    #[test]
    fn varint_rejects_truncated_input() {
        let bytes = [0x80u8, 0x80];
        let err = decode_varint(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::MalformedVarint);
    }

    #[test]
    fn zigzag_maps_sign_to_low_bit() {
        assert_eq!(encode_zigzag64(0), 0);
        assert_eq!(encode_zigzag64(-1), 1);
        assert_eq!(encode_zigzag64(1), 2);
        assert_eq!(encode_zigzag64(-2), 3);
        assert_eq!(encode_zigzag64(i64::MAX), u64::MAX - 1);
        assert_eq!(encode_zigzag64(i64::MIN), u64::MAX);
    }

    #[test]
    fn key_roundtrip() {
        for number in [1u32, 15, 16, 2047, 2048, MAX_FIELD_NUMBER] {
            for wire_type in [
                WireType::Varint,
                WireType::SixtyFourBit,
                WireType::LengthDelimited,
                WireType::ThirtyTwoBit,
            ] {
                let mut buf = Vec::new();
                encode_key(number, wire_type, &mut buf);
                assert_eq!(buf.len(), key_len(number));
                let mut slice = buf.as_slice();
                let mut capped = Capped::new(&mut slice);
                assert_eq!(decode_key(&mut capped).unwrap(), (number, wire_type));
            }
        }
    }

    #[test]
    fn key_rejects_group_and_reserved_wire_types() {
        for wire_type in [3u64, 4, 6, 7] {
            let mut buf = Vec::new();
            encode_varint((1 << 3) | wire_type, &mut buf);
            let mut slice = buf.as_slice();
            let mut capped = Capped::new(&mut slice);
            let err = decode_key(&mut capped).unwrap_err();
            assert_eq!(err.kind(), DecodeErrorKind::UnsupportedWireType);
        }
    }

    #[test]
    fn key_rejects_field_number_zero() {
        let bytes = [0x00u8];
        let mut slice = bytes.as_slice();
        let mut capped = Capped::new(&mut slice);
        let err = decode_key(&mut capped).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidTag);
    }

    #[test]
    fn wire_type_mismatch_is_detected() {
        assert!(check_wire_type(WireType::Varint, WireType::Varint).is_ok());
        let err = check_wire_type(WireType::Varint, WireType::LengthDelimited).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::UnsupportedWireType);
    }

    #[test]
    fn length_delimited_rejects_truncation() {
        // Declared length 10, only 3 bytes remain.
        let bytes = [0x0Au8, b'a', b'b', b'c'];
        let mut slice = bytes.as_slice();
        let mut capped = Capped::new(&mut slice);
        let err = capped.take_length_delimited().unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
    }

    #[test]
    fn nested_cap_limits_inner_reads() {
        // Outer region declares 2 bytes; the inner delimiter claims 3.
        let bytes = [0x02u8, 0x03, b'x', b'y', b'z'];
        let mut slice = bytes.as_slice();
        let mut outer = Capped::new_length_delimited(&mut slice).unwrap();
        let err = outer.take_length_delimited().unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
    }

    #[test]
    fn string_decode_is_permissive() {
        let mut buf = Vec::new();
        encode_length_delimited(&[0x66, 0xFF, 0x6F], &mut buf);
        let mut slice = buf.as_slice();
        let mut capped = Capped::new(&mut slice);
        assert_eq!(decode_string(&mut capped).unwrap(), "f\u{FFFD}o");
    }

    #[test]
    fn skip_field_advances_past_each_wire_type() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        buf.extend_from_slice(&42u64.to_le_bytes());
        encode_length_delimited(b"payload", &mut buf);
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.push(0x2A);

        let mut slice = buf.as_slice();
        let mut capped = Capped::new(&mut slice);
        skip_field(WireType::Varint, &mut capped).unwrap();
        skip_field(WireType::SixtyFourBit, &mut capped).unwrap();
        skip_field(WireType::LengthDelimited, &mut capped).unwrap();
        skip_field(WireType::ThirtyTwoBit, &mut capped).unwrap();
        assert_eq!(capped.decode_varint().unwrap(), 0x2A);
        assert_eq!(capped.remaining_before_cap(), 0);
    }

    #[test]
    fn skip_field_rejects_truncated_fixed_width() {
        let bytes = [0u8, 1, 2];
        let mut slice = bytes.as_slice();
        let mut capped = Capped::new(&mut slice);
        let err = skip_field(WireType::ThirtyTwoBit, &mut capped).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
    }

    proptest! {
        #[test]
        fn varint_roundtrip(value: u64) {
            prop_assert_eq!(roundtrip_varint(value), value);
        }

        #[test]
        fn zigzag_roundtrip(value: i64) {
            prop_assert_eq!(decode_zigzag64(encode_zigzag64(value)), value);
        }

        #[test]
        fn varint_decode_never_reads_more_than_ten_bytes(bytes: Vec<u8>) {
            let total = bytes.len();
            let mut slice = bytes.as_slice();
            let _ = decode_varint(&mut slice);
            prop_assert!(total - slice.len() <= 10);
        }
    }

    #[test]
    fn lend_preserves_the_cap() {
        let bytes = vec![1u8, 2, 3, 4, 5];
        let mut slice = bytes.as_slice();
        let mut capped = Capped::new(&mut slice);
        let lent = capped.lend();
        assert_eq!(lent.remaining_before_cap(), 5);
        assert_eq!(capped.remaining_before_cap(), 5);
    }
}
