//! The immutable built message value.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::builder::Builder;
use crate::descriptor::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::encoding::{
    encode_key, encode_length_delimited, encode_varint, encoded_len_length_delimited,
    encoded_len_varint, key_len, Capped, DecodeContext, WireType,
};
use crate::presence::PresenceSet;
use crate::unknown::{UnknownFieldSet, UnknownValue};
use crate::{DecodeError, EncodeError};

/// One built field value.
#[derive(Clone, PartialEq)]
pub(crate) enum FieldValue {
    /// An unset singular message field, or a oneof member whose value (if
    /// any) lives in the group's slot instead.
    None,
    Str(String),
    EnumValue(i32),
    Msg(Box<Message>),
    StrList(Vec<String>),
    MsgList(Vec<Message>),
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => f.write_str("None"),
            FieldValue::Str(v) => v.fmt(f),
            FieldValue::EnumValue(v) => v.fmt(f),
            FieldValue::Msg(v) => v.fmt(f),
            FieldValue::StrList(v) => v.fmt(f),
            FieldValue::MsgList(v) => v.fmt(f),
        }
    }
}

/// An immutable message value, produced by [`Builder::build`].
///
/// A message is safe to share across threads without synchronization. Its
/// memoized serialized size and hash are computed idempotently: racing
/// threads compute the same value, and the cached state only ever moves from
/// "uncomputed" to one stable value.
pub struct Message {
    desc: &'static MessageDescriptor,
    values: Vec<FieldValue>,
    presence: PresenceSet,
    oneofs: Vec<Option<(u32, FieldValue)>>,
    unknown: UnknownFieldSet,
    /// Memoized `encoded_len() + 1`; zero means not yet computed.
    memoized_size: AtomicUsize,
    /// Memoized structural hash; zero means not yet computed. A hash that
    /// genuinely computes to zero is recomputed on every call, which is
    /// harmless.
    memoized_hash: AtomicU64,
}

impl Message {
    pub(crate) fn from_parts(
        desc: &'static MessageDescriptor,
        values: Vec<FieldValue>,
        presence: PresenceSet,
        oneofs: Vec<Option<(u32, FieldValue)>>,
        unknown: UnknownFieldSet,
    ) -> Message {
        Message {
            desc,
            values,
            presence,
            oneofs,
            unknown,
            memoized_size: AtomicUsize::new(0),
            memoized_hash: AtomicU64::new(0),
        }
    }

    /// The descriptor this message was built against.
    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.desc
    }

    /// Decodes a message from wire-format bytes, consuming the entire
    /// buffer.
    pub fn decode<B: Buf>(
        desc: &'static MessageDescriptor,
        mut buf: B,
    ) -> Result<Message, DecodeError> {
        let mut builder = Builder::new(desc);
        builder.merge_capped(Capped::new(&mut buf), DecodeContext::default())?;
        Ok(builder.snapshot())
    }

    /// Decodes a length-delimited message from the buffer.
    pub fn decode_length_delimited<B: Buf>(
        desc: &'static MessageDescriptor,
        mut buf: B,
    ) -> Result<Message, DecodeError> {
        let mut builder = Builder::new(desc);
        builder.merge_capped(
            Capped::new_length_delimited(&mut buf)?,
            DecodeContext::default(),
        )?;
        Ok(builder.snapshot())
    }

    /// Returns a builder staged with this message's values, presence,
    /// oneof cases, and unknown fields.
    pub fn to_builder(&self) -> Builder {
        Builder::from_message(self)
    }

    pub(crate) fn field_values(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn field_value(&self, index: usize) -> &FieldValue {
        &self.values[index]
    }

    pub(crate) fn presence(&self) -> &PresenceSet {
        &self.presence
    }

    pub(crate) fn oneof_slots(&self) -> &[Option<(u32, FieldValue)>] {
        &self.oneofs
    }

    /// The unrecognized fields captured when this message was decoded.
    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown
    }

    fn checked_index(&self, number: u32) -> usize {
        self.desc.index_of(number).unwrap_or_else(|| {
            panic!("message {} has no field {}", self.desc.name(), number)
        })
    }

    fn kind_mismatch(&self, index: usize, expected: &str) -> ! {
        let field = &self.desc.fields()[index];
        panic!(
            "field {}.{} is not {} (kind is {:?})",
            self.desc.name(),
            field.name(),
            expected,
            field.kind(),
        )
    }

    /// The value slot for a singular field, resolving oneof members through
    /// their group's active case.
    fn singular_value(&self, index: usize, number: u32) -> Option<&FieldValue> {
        match self.desc.oneof_index(index) {
            Some(group) => match &self.oneofs[group] {
                Some((active, value)) if *active == number => Some(value),
                _ => None,
            },
            None => Some(&self.values[index]),
        }
    }

    /// Returns a singular string field's value, or the empty string if the
    /// field is unset.
    pub fn get_str(&self, number: u32) -> &str {
        let index = self.checked_index(number);
        match self.desc.fields()[index].kind() {
            FieldKind::String => match self.singular_value(index, number) {
                Some(FieldValue::Str(value)) => value,
                _ => "",
            },
            _ => self.kind_mismatch(index, "a singular string"),
        }
    }

    /// Returns a singular enum field's numeric value, or 0 if the field is
    /// unset. The value may be one the schema does not declare.
    pub fn get_enum_value(&self, number: u32) -> i32 {
        let index = self.checked_index(number);
        match self.desc.fields()[index].kind() {
            FieldKind::Enum(_) => match self.singular_value(index, number) {
                Some(FieldValue::EnumValue(value)) => *value,
                _ => 0,
            },
            _ => self.kind_mismatch(index, "an enum"),
        }
    }

    /// Returns a singular message field's value, or `None` if the field is
    /// unset.
    pub fn get_message(&self, number: u32) -> Option<&Message> {
        let index = self.checked_index(number);
        match self.desc.fields()[index].kind() {
            FieldKind::Message(_) => match self.singular_value(index, number) {
                Some(FieldValue::Msg(value)) => Some(value),
                _ => None,
            },
            _ => self.kind_mismatch(index, "a singular message"),
        }
    }

    /// Returns a repeated string field's elements, in accumulation order.
    pub fn get_repeated_str(&self, number: u32) -> &[String] {
        let index = self.checked_index(number);
        match (self.desc.fields()[index].kind(), &self.values[index]) {
            (FieldKind::RepeatedString, FieldValue::StrList(values)) => values,
            _ => self.kind_mismatch(index, "a repeated string"),
        }
    }

    /// Returns a repeated message field's elements, in accumulation order.
    pub fn get_repeated_message(&self, number: u32) -> &[Message] {
        let index = self.checked_index(number);
        match (self.desc.fields()[index].kind(), &self.values[index]) {
            (FieldKind::RepeatedMessage(_), FieldValue::MsgList(values)) => values,
            _ => self.kind_mismatch(index, "a repeated message"),
        }
    }

    /// Reports whether the field was explicitly set.
    ///
    /// Valid only for singular message fields and oneof members, where the
    /// unset state is distinguishable; presence is not exposed for plain
    /// scalar fields.
    ///
    /// # Panics
    ///
    /// Panics for field kinds that do not track presence.
    pub fn has(&self, number: u32) -> bool {
        let index = self.checked_index(number);
        if self.desc.oneof_index(index).is_some() {
            return self.singular_value(index, number).is_some();
        }
        match self.desc.fields()[index].kind() {
            FieldKind::Message(_) => matches!(self.values[index], FieldValue::Msg(_)),
            _ => self.kind_mismatch(index, "a presence-tracked field"),
        }
    }

    /// Returns the field number of the named oneof group's active member, or
    /// `None` if no member is set.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor declares no oneof with that name.
    pub fn oneof_case(&self, name: &str) -> Option<u32> {
        let group = self.desc.oneof_position(name).unwrap_or_else(|| {
            panic!("message {} has no oneof {}", self.desc.name(), name)
        });
        self.oneofs[group].as_ref().map(|(number, _)| *number)
    }

    /// Encodes one present singular value, unconditionally.
    fn encode_singular<B: BufMut + ?Sized>(number: u32, value: &FieldValue, buf: &mut B) {
        match value {
            FieldValue::Str(v) => {
                encode_key(number, WireType::LengthDelimited, buf);
                encode_length_delimited(v.as_bytes(), buf);
            }
            FieldValue::EnumValue(v) => {
                encode_key(number, WireType::Varint, buf);
                // Negative enum values sign-extend to ten wire bytes, the
                // int32 varint convention.
                encode_varint(*v as i64 as u64, buf);
            }
            FieldValue::Msg(v) => {
                encode_key(number, WireType::LengthDelimited, buf);
                encode_varint(v.encoded_len() as u64, buf);
                v.encode_raw(buf);
            }
            _ => unreachable!(),
        }
    }

    fn singular_len(number: u32, value: &FieldValue) -> usize {
        key_len(number)
            + match value {
                FieldValue::Str(v) => encoded_len_length_delimited(v.len()),
                FieldValue::EnumValue(v) => encoded_len_varint(*v as i64 as u64),
                FieldValue::Msg(v) => encoded_len_length_delimited(v.encoded_len()),
                _ => unreachable!(),
            }
    }

    /// A plain singular field is emitted iff its presence bit is set or its
    /// value differs from the kind's zero value; repeated fields are emitted
    /// iff non-empty.
    fn plain_field_emitted(&self, index: usize) -> bool {
        match &self.values[index] {
            FieldValue::None => false,
            FieldValue::Str(v) => self.presence.get(index) || !v.is_empty(),
            FieldValue::EnumValue(v) => self.presence.get(index) || *v != 0,
            FieldValue::Msg(_) => true,
            FieldValue::StrList(v) => !v.is_empty(),
            FieldValue::MsgList(v) => !v.is_empty(),
        }
    }

    fn encode_plain_field<B: BufMut + ?Sized>(
        &self,
        index: usize,
        field: &FieldDescriptor,
        buf: &mut B,
    ) {
        if !self.plain_field_emitted(index) {
            return;
        }
        match &self.values[index] {
            FieldValue::StrList(values) => {
                for value in values {
                    encode_key(field.number(), WireType::LengthDelimited, buf);
                    encode_length_delimited(value.as_bytes(), buf);
                }
            }
            FieldValue::MsgList(values) => {
                for value in values {
                    encode_key(field.number(), WireType::LengthDelimited, buf);
                    encode_varint(value.encoded_len() as u64, buf);
                    value.encode_raw(buf);
                }
            }
            value => Self::encode_singular(field.number(), value, buf),
        }
    }

    fn plain_field_len(&self, index: usize, field: &FieldDescriptor) -> usize {
        if !self.plain_field_emitted(index) {
            return 0;
        }
        match &self.values[index] {
            FieldValue::StrList(values) => values
                .iter()
                .map(|v| key_len(field.number()) + encoded_len_length_delimited(v.len()))
                .sum(),
            FieldValue::MsgList(values) => values
                .iter()
                .map(|v| key_len(field.number()) + encoded_len_length_delimited(v.encoded_len()))
                .sum(),
            value => Self::singular_len(field.number(), value),
        }
    }

    /// Emits all fields in ascending field-number order, then the unknown
    /// fields in their captured order. Output is deterministic regardless of
    /// the order fields were staged.
    pub(crate) fn encode_raw<B: BufMut + ?Sized>(&self, buf: &mut B) {
        for (index, field) in self.desc.fields().iter().enumerate() {
            match self.desc.oneof_index(index) {
                Some(group) => {
                    // An active oneof member is emitted even when its value
                    // equals the zero value; the case itself carries meaning.
                    if let Some((active, value)) = &self.oneofs[group] {
                        if *active == field.number() {
                            Self::encode_singular(field.number(), value, buf);
                        }
                    }
                }
                None => self.encode_plain_field(index, field, buf),
            }
        }
        self.unknown.encode(buf);
    }

    fn raw_encoded_len(&self) -> usize {
        let mut len = 0;
        for (index, field) in self.desc.fields().iter().enumerate() {
            match self.desc.oneof_index(index) {
                Some(group) => {
                    if let Some((active, value)) = &self.oneofs[group] {
                        if *active == field.number() {
                            len += Self::singular_len(field.number(), value);
                        }
                    }
                }
                None => len += self.plain_field_len(index, field),
            }
        }
        len + self.unknown.encoded_len()
    }

    /// Returns the encoded length of the message without a length delimiter.
    ///
    /// Memoized after the first computation; the message is immutable so the
    /// cache never invalidates.
    pub fn encoded_len(&self) -> usize {
        match self.memoized_size.load(Relaxed) {
            0 => {
                let len = self.raw_encoded_len();
                self.memoized_size.store(len + 1, Relaxed);
                len
            }
            memoized => memoized - 1,
        }
    }

    /// Encodes the message to a buffer.
    ///
    /// An error will be returned if the buffer does not have sufficient
    /// capacity.
    pub fn encode<B: BufMut + ?Sized>(&self, buf: &mut B) -> Result<(), EncodeError> {
        let required = self.encoded_len();
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::new(required, remaining));
        }
        self.encode_raw(buf);
        Ok(())
    }

    /// Encodes the message to a newly allocated buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_raw(&mut buf);
        buf
    }

    /// Encodes the message to a `Bytes` buffer.
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_raw(&mut buf);
        buf.freeze()
    }

    /// Encodes the message with a length delimiter to a buffer.
    ///
    /// An error will be returned if the buffer does not have sufficient
    /// capacity.
    pub fn encode_length_delimited<B: BufMut + ?Sized>(
        &self,
        buf: &mut B,
    ) -> Result<(), EncodeError> {
        let len = self.encoded_len();
        let required = len + encoded_len_varint(len as u64);
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::new(required, remaining));
        }
        encode_varint(len as u64, buf);
        self.encode_raw(buf);
        Ok(())
    }

    /// Encodes the message with a length delimiter to a newly allocated
    /// buffer.
    pub fn encode_length_delimited_to_vec(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut buf = Vec::with_capacity(len + encoded_len_varint(len as u64));
        encode_varint(len as u64, &mut buf);
        self.encode_raw(&mut buf);
        buf
    }

    /// The message's structural hash, memoized after the first computation.
    fn structural_hash(&self) -> u64 {
        match self.memoized_hash.load(Relaxed) {
            0 => {
                let hash = self.compute_hash();
                self.memoized_hash.store(hash, Relaxed);
                hash
            }
            memoized => memoized,
        }
    }

    fn compute_hash(&self) -> u64 {
        let mut hash = 41u64;
        hash = mix(hash, 19, hash_str(self.desc.name()));
        for (index, field) in self.desc.fields().iter().enumerate() {
            if self.desc.oneof_index(index).is_some() {
                continue;
            }
            hash = mix(hash, 37, u64::from(field.number()));
            hash = mix(hash, 53, hash_value(&self.values[index]));
        }
        for slot in &self.oneofs {
            match slot {
                Some((number, value)) => {
                    hash = mix(hash, 37, u64::from(*number));
                    hash = mix(hash, 53, hash_value(value));
                }
                None => hash = mix(hash, 37, 0),
            }
        }
        for (number, value) in self.unknown.iter() {
            hash = mix(hash, 37, u64::from(*number));
            hash = mix(hash, 53, hash_unknown(value));
        }
        hash
    }
}

#[inline]
fn mix(hash: u64, multiplier: u64, value: u64) -> u64 {
    hash.wrapping_mul(multiplier).wrapping_add(value)
}

fn hash_str(value: &str) -> u64 {
    value
        .bytes()
        .fold(0u64, |hash, byte| mix(hash, 31, u64::from(byte)))
}

fn hash_bytes(value: &[u8]) -> u64 {
    value
        .iter()
        .fold(0u64, |hash, byte| mix(hash, 31, u64::from(*byte)))
}

fn hash_value(value: &FieldValue) -> u64 {
    match value {
        FieldValue::None => 0,
        FieldValue::Str(v) => hash_str(v),
        FieldValue::EnumValue(v) => *v as i64 as u64,
        FieldValue::Msg(v) => v.structural_hash(),
        FieldValue::StrList(values) => values
            .iter()
            .fold(1u64, |hash, v| mix(hash, 31, hash_str(v))),
        FieldValue::MsgList(values) => values
            .iter()
            .fold(1u64, |hash, v| mix(hash, 31, v.structural_hash())),
    }
}

fn hash_unknown(value: &UnknownValue) -> u64 {
    match value {
        UnknownValue::Varint(v) => *v,
        UnknownValue::SixtyFourBit(v) => hash_bytes(v),
        UnknownValue::LengthDelimited(v) => hash_bytes(v),
        UnknownValue::ThirtyTwoBit(v) => hash_bytes(v),
    }
}

/// Structural equality: two messages of the same type are equal iff every
/// declared field compares equal and their unknown fields compare equal
/// byte-for-byte. The memoized size and hash do not participate.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.desc, other.desc)
            && self.values == other.values
            && self.oneofs == other.oneofs
            && self.unknown == other.unknown
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Message {
            desc: self.desc,
            values: self.values.clone(),
            presence: self.presence.clone(),
            oneofs: self.oneofs.clone(),
            unknown: self.unknown.clone(),
            memoized_size: AtomicUsize::new(self.memoized_size.load(Relaxed)),
            memoized_hash: AtomicU64::new(self.memoized_hash.load(Relaxed)),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.desc.name());
        for (index, field) in self.desc.fields().iter().enumerate() {
            match self.desc.oneof_index(index) {
                Some(group) => {
                    if let Some((active, value)) = &self.oneofs[group] {
                        if *active == field.number() {
                            s.field(field.name(), value);
                        }
                    }
                }
                None => {
                    s.field(field.name(), &self.values[index]);
                }
            }
        }
        if !self.unknown.is_empty() {
            s.field("unknown_fields", &self.unknown);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EnumDescriptor, FieldDescriptor, OneofDescriptor};
    use alloc::format;
    use alloc::vec;
    use static_assertions::assert_impl_all;
    use std::sync::LazyLock;

    assert_impl_all!(Message: Send, Sync, Clone, PartialEq);
    assert_impl_all!(crate::DecodeError: Send, Sync);
    assert_impl_all!(crate::EncodeError: Send, Sync);

    static MOOD: LazyLock<EnumDescriptor> = LazyLock::new(|| {
        EnumDescriptor::new(
            "Mood",
            vec![(0, "MOOD_UNSPECIFIED"), (1, "MOOD_SUNNY"), (2, "MOOD_GRIM")],
        )
    });

    static ENTRY: LazyLock<MessageDescriptor> = LazyLock::new(|| {
        MessageDescriptor::new(
            "Entry",
            vec![
                FieldDescriptor::new(1, "title", FieldKind::String),
                FieldDescriptor::new(2, "mood", FieldKind::Enum(LazyLock::force(&MOOD))),
                FieldDescriptor::new(3, "alias", FieldKind::String),
                FieldDescriptor::new(4, "pinned", FieldKind::String),
            ],
            vec![OneofDescriptor::new("extra", vec![3, 4])],
        )
    });

    fn entry() -> &'static MessageDescriptor {
        LazyLock::force(&ENTRY)
    }

    #[test]
    fn zero_value_accessors_for_unset_fields() {
        let message = Builder::new(entry()).build().unwrap();
        assert_eq!(message.get_str(1), "");
        assert_eq!(message.get_enum_value(2), 0);
        assert_eq!(message.oneof_case("extra"), None);
        assert!(!message.has(3));
        assert!(!message.has(4));
    }

    #[test]
    fn encoded_len_matches_actual_output() {
        let message = Builder::new(entry())
            .set_str(1, "calibration")
            .set_enum_value(2, 2)
            .set_str(4, "yes")
            .build()
            .unwrap();
        let bytes = message.encode_to_vec();
        assert_eq!(message.encoded_len(), bytes.len());
        // Memoized path returns the same answer.
        assert_eq!(message.encoded_len(), bytes.len());
        assert_eq!(message.encode_to_bytes(), bytes.as_slice());
    }

    #[test]
    fn fields_are_emitted_in_ascending_number_order() {
        let message = Builder::new(entry())
            .set_enum_value(2, 1)
            .set_str(1, "later")
            .build()
            .unwrap();
        let bytes = message.encode_to_vec();
        // Key 0x0A is field 1 length-delimited; 0x10 is field 2 varint.
        assert_eq!(bytes[0], 0x0A);
        assert_eq!(bytes[bytes.len() - 2], 0x10);
    }

    #[test]
    fn negative_enum_values_use_ten_wire_bytes() {
        let message = Builder::new(entry())
            .set_enum_value(2, -1)
            .build()
            .unwrap();
        // One key byte plus the sign-extended varint.
        assert_eq!(message.encoded_len(), 11);
        let decoded = Message::decode(entry(), message.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.get_enum_value(2), -1);
    }

    #[test]
    fn explicitly_set_empty_string_is_emitted() {
        let unset = Builder::new(entry()).build().unwrap();
        let set_empty = Builder::new(entry()).set_str(1, "").build().unwrap();
        assert!(unset.encode_to_vec().is_empty());
        // Presence was recorded, so the empty value gets a tag on the wire.
        assert_eq!(set_empty.encode_to_vec(), vec![0x0A, 0x00]);
        // Value-level equality does not see presence.
        assert_eq!(unset, set_empty);
        // A wire round-trip of the explicit form re-emits it.
        let decoded = Message::decode(entry(), set_empty.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.encode_to_vec(), vec![0x0A, 0x00]);
    }

    #[test]
    fn equal_messages_share_a_hash() {
        let a = Builder::new(entry())
            .set_str(1, "same")
            .set_enum_value(2, 1)
            .build()
            .unwrap();
        let b = a.to_builder().build().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());

        let c = Builder::new(entry())
            .set_str(1, "different")
            .build()
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn oneof_member_with_zero_value_is_still_emitted() {
        let message = Builder::new(entry()).set_str(3, "").build().unwrap();
        assert_eq!(message.oneof_case("extra"), Some(3));
        let bytes = message.encode_to_vec();
        assert_eq!(bytes, vec![0x1A, 0x00]);
        let decoded = Message::decode(entry(), bytes.as_slice()).unwrap();
        assert_eq!(decoded.oneof_case("extra"), Some(3));
        assert!(decoded.has(3));
    }

    #[test]
    fn length_delimited_roundtrip() {
        let message = Builder::new(entry()).set_str(1, "framed").build().unwrap();
        let mut framed = Vec::new();
        message.encode_length_delimited(&mut framed).unwrap();
        assert_eq!(framed, message.encode_length_delimited_to_vec());
        let decoded = Message::decode_length_delimited(entry(), framed.as_slice()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn encode_fails_on_insufficient_capacity() {
        let message = Builder::new(entry())
            .set_str(1, "too big")
            .build()
            .unwrap();
        let mut tiny = [0u8; 2];
        let err = message.encode(&mut tiny.as_mut_slice()).unwrap_err();
        assert_eq!(err.required_capacity(), message.encoded_len());
        assert_eq!(err.remaining(), 2);
    }

    #[test]
    fn debug_renders_field_names() {
        let message = Builder::new(entry())
            .set_str(1, "shown")
            .set_enum_value(2, 2)
            .build()
            .unwrap();
        let rendered = format!("{:?}", message);
        assert!(rendered.starts_with("Entry"));
        assert!(rendered.contains("title: \"shown\""));
        assert!(rendered.contains("mood: 2"));
    }
}
