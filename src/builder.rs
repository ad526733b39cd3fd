//! Mutable staging for incremental message construction.

use alloc::string::String;
use alloc::vec::Vec;

use bytes::Buf;

use crate::descriptor::{FieldKind, MessageDescriptor};
use crate::encoding::{decode_key, decode_string, Capped, DecodeContext};
use crate::message::{FieldValue, Message};
use crate::presence::PresenceSet;
use crate::unknown::{UnknownFieldSet, UnknownValue};
use crate::DecodeErrorKind::Truncated;
use crate::{BuildError, DecodeError};

/// One staged field value.
#[derive(Clone, Debug)]
enum Staged {
    /// An unset singular message field, or a oneof member whose value (if
    /// any) lives in the group's slot instead.
    None,
    Str(String),
    EnumValue(i32),
    Msg(Builder),
    StrList(Vec<String>),
    MsgList(Vec<Message>),
}

impl Staged {
    fn initial(kind: &FieldKind, in_oneof: bool) -> Staged {
        if in_oneof {
            // Oneof members share the group slot; the field slot stays inert.
            return Staged::None;
        }
        match kind {
            FieldKind::String => Staged::Str(String::new()),
            FieldKind::Enum(_) => Staged::EnumValue(0),
            FieldKind::Message(_) => Staged::None,
            FieldKind::RepeatedString => Staged::StrList(Vec::new()),
            FieldKind::RepeatedMessage(_) => Staged::MsgList(Vec::new()),
        }
    }

    fn build(&self) -> FieldValue {
        match self {
            Staged::None => FieldValue::None,
            Staged::Str(value) => FieldValue::Str(value.clone()),
            Staged::EnumValue(value) => FieldValue::EnumValue(*value),
            Staged::Msg(builder) => FieldValue::Msg(alloc::boxed::Box::new(builder.snapshot())),
            Staged::StrList(values) => FieldValue::StrList(values.clone()),
            Staged::MsgList(values) => FieldValue::MsgList(values.clone()),
        }
    }

    fn from_value(value: &FieldValue) -> Staged {
        match value {
            FieldValue::None => Staged::None,
            FieldValue::Str(v) => Staged::Str(v.clone()),
            FieldValue::EnumValue(v) => Staged::EnumValue(*v),
            FieldValue::Msg(m) => Staged::Msg(m.to_builder()),
            FieldValue::StrList(v) => Staged::StrList(v.clone()),
            FieldValue::MsgList(v) => Staged::MsgList(v.clone()),
        }
    }
}

/// A mutable staging area for one message instance.
///
/// A builder owns staged values for every declared field, a presence bit per
/// singular field, one active-case slot per oneof group, and an overflow
/// buffer of unrecognized wire data. [`build`](Builder::build) snapshots the
/// staged state into an immutable [`Message`] without consuming the builder,
/// which may continue to be mutated and built again.
///
/// A builder is not safe for concurrent mutation; confine it to one thread
/// or serialize access externally.
///
/// # Panics
///
/// The typed `set_*`/`add_*` operations panic when given a field number the
/// descriptor does not declare, or one whose kind does not match the method.
/// Schema tables come from generated code, so a mismatch is a programming
/// error rather than a runtime condition.
#[derive(Clone, Debug)]
pub struct Builder {
    desc: &'static MessageDescriptor,
    slots: Vec<Staged>,
    presence: PresenceSet,
    oneofs: Vec<Option<(u32, Staged)>>,
    unknown: UnknownFieldSet,
}

impl Builder {
    /// Creates a builder with every field unset.
    pub fn new(desc: &'static MessageDescriptor) -> Builder {
        let slots = desc
            .fields()
            .iter()
            .enumerate()
            .map(|(index, field)| Staged::initial(field.kind(), desc.oneof_index(index).is_some()))
            .collect();
        Builder {
            desc,
            slots,
            presence: PresenceSet::new(desc.fields().len()),
            oneofs: alloc::vec![None; desc.oneofs().len()],
            unknown: UnknownFieldSet::default(),
        }
    }

    pub(crate) fn from_message(message: &Message) -> Builder {
        Builder {
            desc: message.descriptor(),
            slots: message.field_values().iter().map(Staged::from_value).collect(),
            presence: message.presence().clone(),
            oneofs: message
                .oneof_slots()
                .iter()
                .map(|slot| {
                    slot.as_ref()
                        .map(|(number, value)| (*number, Staged::from_value(value)))
                })
                .collect(),
            unknown: message.unknown_fields().clone(),
        }
    }

    /// The descriptor this builder stages values for.
    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.desc
    }

    fn lookup(&self, number: u32) -> usize {
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

    /// Stages a singular value, routing it to the oneof group slot when the
    /// field is a oneof member (which implicitly clears any sibling).
    fn stage_singular(&mut self, index: usize, number: u32, staged: Staged) {
        match self.desc.oneof_index(index) {
            Some(group) => self.oneofs[group] = Some((number, staged)),
            None => {
                self.slots[index] = staged;
                self.presence.set(index);
            }
        }
    }

    /// Sets a singular string field.
    pub fn set_str(&mut self, number: u32, value: impl Into<String>) -> &mut Self {
        let index = self.lookup(number);
        match self.desc.fields()[index].kind() {
            FieldKind::String => self.stage_singular(index, number, Staged::Str(value.into())),
            _ => self.kind_mismatch(index, "a singular string"),
        }
        self
    }

    /// Sets a singular enum field to a numeric value. The value need not be
    /// a declared member of the enum; unknown values are preserved.
    pub fn set_enum_value(&mut self, number: u32, value: i32) -> &mut Self {
        let index = self.lookup(number);
        match self.desc.fields()[index].kind() {
            FieldKind::Enum(_) => self.stage_singular(index, number, Staged::EnumValue(value)),
            _ => self.kind_mismatch(index, "an enum"),
        }
        self
    }

    /// Sets a singular message field, replacing any staged value.
    pub fn set_message(&mut self, number: u32, value: Message) -> &mut Self {
        let index = self.lookup(number);
        match self.desc.fields()[index].kind() {
            FieldKind::Message(sub) => {
                assert!(
                    core::ptr::eq(*sub, value.descriptor()),
                    "field {}.{} holds {} messages, got {}",
                    self.desc.name(),
                    self.desc.fields()[index].name(),
                    sub.name(),
                    value.descriptor().name(),
                );
                self.stage_singular(index, number, Staged::Msg(value.to_builder()));
            }
            _ => self.kind_mismatch(index, "a singular message"),
        }
        self
    }

    /// Appends one element to a repeated string field.
    pub fn add_str(&mut self, number: u32, value: impl Into<String>) -> &mut Self {
        let index = self.lookup(number);
        match (self.desc.fields()[index].kind(), &mut self.slots[index]) {
            (FieldKind::RepeatedString, Staged::StrList(values)) => values.push(value.into()),
            _ => self.kind_mismatch(index, "a repeated string"),
        }
        self
    }

    /// Appends one element to a repeated message field.
    pub fn add_message(&mut self, number: u32, value: Message) -> &mut Self {
        let index = self.lookup(number);
        match self.desc.fields()[index].kind() {
            FieldKind::RepeatedMessage(sub) => {
                assert!(
                    core::ptr::eq(*sub, value.descriptor()),
                    "field {}.{} holds {} messages, got {}",
                    self.desc.name(),
                    self.desc.fields()[index].name(),
                    sub.name(),
                    value.descriptor().name(),
                );
                let Staged::MsgList(values) = &mut self.slots[index] else {
                    unreachable!()
                };
                values.push(value);
            }
            _ => self.kind_mismatch(index, "a repeated message"),
        }
        self
    }

    /// Clears one field back to unset. For a oneof member, the group's case
    /// is cleared only if that member is the active one.
    pub fn clear(&mut self, number: u32) -> &mut Self {
        let index = self.lookup(number);
        match self.desc.oneof_index(index) {
            Some(group) => {
                if matches!(&self.oneofs[group], Some((active, _)) if *active == number) {
                    self.oneofs[group] = None;
                }
            }
            None => {
                self.slots[index] = Staged::initial(self.desc.fields()[index].kind(), false);
                self.presence.clear(index);
            }
        }
        self
    }

    /// Clears the named oneof group, whichever member is active.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor declares no oneof with that name.
    pub fn clear_oneof(&mut self, name: &str) -> &mut Self {
        let group = self.desc.oneof_position(name).unwrap_or_else(|| {
            panic!("message {} has no oneof {}", self.desc.name(), name)
        });
        self.oneofs[group] = None;
        self
    }

    /// Resets every field, oneof case, presence bit, and the unknown-field
    /// buffer.
    pub fn clear_all(&mut self) -> &mut Self {
        let desc = self.desc;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = Staged::initial(
                desc.fields()[index].kind(),
                desc.oneof_index(index).is_some(),
            );
        }
        self.presence.clear_all();
        self.oneofs.iter_mut().for_each(|slot| *slot = None);
        self.unknown.clear();
        self
    }

    /// Merges wire-format bytes into this builder, consuming the buffer to
    /// its end.
    ///
    /// Decoding is field-by-field and eager: on malformed input the merge
    /// aborts at the offending byte and the builder may be left partially
    /// updated. Callers needing atomicity should merge into a fresh builder
    /// and discard it on failure.
    pub fn merge_from<B: Buf>(&mut self, mut buf: B) -> Result<&mut Self, DecodeError> {
        self.merge_capped(Capped::new(&mut buf), DecodeContext::default())?;
        Ok(self)
    }

    /// Merges one length-delimited message from the buffer: a length
    /// delimiter followed by that many bytes of wire data.
    pub fn merge_length_delimited<B: Buf>(&mut self, mut buf: B) -> Result<&mut Self, DecodeError> {
        self.merge_capped(
            Capped::new_length_delimited(&mut buf)?,
            DecodeContext::default(),
        )?;
        Ok(self)
    }

    /// Runs the field merge loop over one capped message region.
    pub(crate) fn merge_capped<B: Buf + ?Sized>(
        &mut self,
        mut buf: Capped<B>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        while buf.remaining_before_cap() > 0 {
            let (number, wire_type) = decode_key(&mut buf)?;
            match self.desc.index_of(number) {
                // A declared field with its declared wire type merges into
                // its slot; a declared number with a foreign wire type is
                // indistinguishable from a schema change and is preserved as
                // an unknown field, like the original runtime does.
                Some(index) if self.desc.fields()[index].kind().wire_type() == wire_type => {
                    let desc = self.desc;
                    self.merge_known_field(index, number, &mut buf, &ctx)
                        .map_err(|mut error| {
                            error.push(desc.name(), desc.fields()[index].name());
                            error
                        })?;
                }
                _ => {
                    let value = UnknownValue::decode(wire_type, &mut buf)?;
                    self.unknown.push(number, value);
                }
            }
            if buf.has_overrun() {
                return Err(DecodeError::new(Truncated));
            }
        }
        Ok(())
    }

    fn merge_known_field<B: Buf + ?Sized>(
        &mut self,
        index: usize,
        number: u32,
        buf: &mut Capped<B>,
        ctx: &DecodeContext,
    ) -> Result<(), DecodeError> {
        let desc = self.desc;
        if let Some(group) = desc.oneof_index(index) {
            return self.merge_oneof_field(group, index, number, buf, ctx);
        }
        match desc.fields()[index].kind() {
            FieldKind::String => {
                let value = decode_string(buf)?;
                self.slots[index] = Staged::Str(value);
                self.presence.set(index);
            }
            FieldKind::Enum(_) => {
                // Open enum: keep the low 32 bits, declared or not.
                let value = buf.decode_varint()? as i32;
                self.slots[index] = Staged::EnumValue(value);
                self.presence.set(index);
            }
            FieldKind::Message(sub) => {
                ctx.limit_reached()?;
                let delimited = buf.take_length_delimited()?;
                // Repeated occurrences of a singular message field merge
                // field-by-field into the staged sub-message, not replace it.
                let slot = &mut self.slots[index];
                if !matches!(slot, Staged::Msg(_)) {
                    *slot = Staged::Msg(Builder::new(*sub));
                }
                let Staged::Msg(nested) = slot else {
                    unreachable!()
                };
                nested.merge_capped(delimited, ctx.enter_recursion())?;
                self.presence.set(index);
            }
            FieldKind::RepeatedString => {
                let value = decode_string(buf)?;
                let Staged::StrList(values) = &mut self.slots[index] else {
                    unreachable!()
                };
                values.push(value);
            }
            FieldKind::RepeatedMessage(sub) => {
                ctx.limit_reached()?;
                let delimited = buf.take_length_delimited()?;
                let mut element = Builder::new(*sub);
                element.merge_capped(delimited, ctx.enter_recursion())?;
                let Staged::MsgList(values) = &mut self.slots[index] else {
                    unreachable!()
                };
                values.push(element.snapshot());
            }
        }
        Ok(())
    }

    fn merge_oneof_field<B: Buf + ?Sized>(
        &mut self,
        group: usize,
        index: usize,
        number: u32,
        buf: &mut Capped<B>,
        ctx: &DecodeContext,
    ) -> Result<(), DecodeError> {
        match self.desc.fields()[index].kind() {
            FieldKind::String => {
                let value = decode_string(buf)?;
                self.oneofs[group] = Some((number, Staged::Str(value)));
            }
            FieldKind::Enum(_) => {
                let value = buf.decode_varint()? as i32;
                self.oneofs[group] = Some((number, Staged::EnumValue(value)));
            }
            FieldKind::Message(sub) => {
                ctx.limit_reached()?;
                let delimited = buf.take_length_delimited()?;
                // Same-member repeats merge recursively; a different member
                // switches the case and drops the sibling's value.
                let slot = &mut self.oneofs[group];
                if !matches!(slot, Some((active, Staged::Msg(_))) if *active == number) {
                    *slot = Some((number, Staged::Msg(Builder::new(*sub))));
                }
                let Some((_, Staged::Msg(nested))) = slot else {
                    unreachable!()
                };
                nested.merge_capped(delimited, ctx.enter_recursion())?;
            }
            // Descriptor construction rejects repeated oneof members.
            FieldKind::RepeatedString | FieldKind::RepeatedMessage(_) => unreachable!(),
        }
        Ok(())
    }

    /// Merges field values from a built message of the same type.
    ///
    /// Singular scalar fields whose value on `other` equals the kind's zero
    /// value are treated as absent and do not overwrite staged values, so a
    /// field cannot be reset to its zero value this way; use
    /// [`clear`](Builder::clear) or a wire-level merge for that. Nested
    /// messages merge recursively, repeated fields concatenate, and a oneof
    /// case set on `other` overwrites this builder's case.
    ///
    /// # Panics
    ///
    /// Panics if `other` was built from a different descriptor.
    pub fn merge_from_message(&mut self, other: &Message) -> &mut Self {
        assert!(
            core::ptr::eq(self.desc, other.descriptor()),
            "cannot merge a {} message into a {} builder",
            other.descriptor().name(),
            self.desc.name(),
        );
        let desc = self.desc;
        for (index, field) in desc.fields().iter().enumerate() {
            if desc.oneof_index(index).is_some() {
                continue;
            }
            match (field.kind(), other.field_value(index)) {
                (FieldKind::String, FieldValue::Str(value)) => {
                    if !value.is_empty() {
                        self.slots[index] = Staged::Str(value.clone());
                        self.presence.set(index);
                    }
                }
                (FieldKind::Enum(_), FieldValue::EnumValue(value)) => {
                    if *value != 0 {
                        self.slots[index] = Staged::EnumValue(*value);
                        self.presence.set(index);
                    }
                }
                (FieldKind::Message(_), FieldValue::Msg(sub)) => {
                    let slot = &mut self.slots[index];
                    if !matches!(slot, Staged::Msg(_)) {
                        *slot = Staged::Msg(Builder::new(sub.descriptor()));
                    }
                    let Staged::Msg(nested) = slot else {
                        unreachable!()
                    };
                    nested.merge_from_message(sub);
                    self.presence.set(index);
                }
                (FieldKind::Message(_), FieldValue::None) => {}
                (FieldKind::RepeatedString, FieldValue::StrList(values)) => {
                    let Staged::StrList(staged) = &mut self.slots[index] else {
                        unreachable!()
                    };
                    staged.extend(values.iter().cloned());
                }
                (FieldKind::RepeatedMessage(_), FieldValue::MsgList(values)) => {
                    let Staged::MsgList(staged) = &mut self.slots[index] else {
                        unreachable!()
                    };
                    staged.extend(values.iter().cloned());
                }
                _ => unreachable!(),
            }
        }
        for (group, slot) in other.oneof_slots().iter().enumerate() {
            let Some((number, value)) = slot else {
                continue;
            };
            match value {
                FieldValue::Msg(sub) => {
                    let staged = &mut self.oneofs[group];
                    if matches!(staged, Some((active, Staged::Msg(_))) if active == number) {
                        let Some((_, Staged::Msg(nested))) = staged else {
                            unreachable!()
                        };
                        nested.merge_from_message(sub);
                    } else {
                        *staged = Some((*number, Staged::Msg(sub.to_builder())));
                    }
                }
                FieldValue::Str(v) => self.oneofs[group] = Some((*number, Staged::Str(v.clone()))),
                FieldValue::EnumValue(v) => {
                    self.oneofs[group] = Some((*number, Staged::EnumValue(*v)))
                }
                _ => unreachable!(),
            }
        }
        self.unknown.extend_from(other.unknown_fields());
        self
    }

    /// Snapshots the staged state into an immutable [`Message`].
    ///
    /// The builder is not consumed or frozen; it may keep being mutated and
    /// built again. Fails only when a declared-required invariant of the
    /// schema is unsatisfied, which no currently expressible descriptor
    /// declares, so in practice this always succeeds.
    pub fn build(&self) -> Result<Message, BuildError> {
        Ok(self.snapshot())
    }

    pub(crate) fn snapshot(&self) -> Message {
        Message::from_parts(
            self.desc,
            self.slots.iter().map(Staged::build).collect(),
            self.presence.clone(),
            self.oneofs
                .iter()
                .map(|slot| {
                    slot.as_ref()
                        .map(|(number, staged)| (*number, staged.build()))
                })
                .collect(),
            self.unknown.clone(),
        )
    }
}
