//! Schema description tables.
//!
//! A [`MessageDescriptor`] is the runtime description of one message type:
//! its field numbers, kinds, and oneof groups. Descriptors are built once at
//! startup (generated code typically holds them in `LazyLock` statics),
//! handed to the codec by `&'static` reference, and never mutated; the codec
//! never invents or alters schema at runtime.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::encoding::{WireType, MAX_FIELD_NUMBER};

/// The kind of value a field holds, which fixes both its in-memory shape and
/// its wire type.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// A singular UTF-8 text field. Zero value is the empty string.
    String,
    /// A singular open enum field, stored as its numeric value. Zero value
    /// is 0.
    Enum(&'static EnumDescriptor),
    /// A singular nested message field.
    Message(&'static MessageDescriptor),
    /// A repeated UTF-8 text field.
    RepeatedString,
    /// A repeated nested message field.
    RepeatedMessage(&'static MessageDescriptor),
}

impl FieldKind {
    /// The wire type this kind encodes with.
    #[inline]
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldKind::Enum(_) => WireType::Varint,
            FieldKind::String
            | FieldKind::Message(_)
            | FieldKind::RepeatedString
            | FieldKind::RepeatedMessage(_) => WireType::LengthDelimited,
        }
    }

    #[inline]
    pub fn is_repeated(&self) -> bool {
        matches!(
            self,
            FieldKind::RepeatedString | FieldKind::RepeatedMessage(_)
        )
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("String"),
            FieldKind::Enum(e) => write!(f, "Enum({})", e.name()),
            FieldKind::Message(m) => write!(f, "Message({})", m.name()),
            FieldKind::RepeatedString => f.write_str("RepeatedString"),
            FieldKind::RepeatedMessage(m) => write!(f, "RepeatedMessage({})", m.name()),
        }
    }
}

/// The description of one declared field: its wire field number, name, and
/// kind. Immutable, defined once per message type.
#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    number: u32,
    name: &'static str,
    kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(number: u32, name: &'static str, kind: FieldKind) -> Self {
        Self { number, name, kind }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// A named group of singular fields of which at most one may hold a value at
/// a time. Setting one member clears any previously set sibling.
#[derive(Clone, Debug)]
pub struct OneofDescriptor {
    name: &'static str,
    members: Vec<u32>,
}

impl OneofDescriptor {
    pub fn new(name: &'static str, members: Vec<u32>) -> Self {
        Self { name, members }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The member field numbers, in declaration order.
    pub fn members(&self) -> &[u32] {
        &self.members
    }
}

/// The description of an enum type: its name and its declared
/// (number, name) values.
///
/// Enums are open: wire values with no declared name are preserved and
/// round-trip unchanged, per the usual forward-compatibility convention.
#[derive(Clone, Debug)]
pub struct EnumDescriptor {
    name: &'static str,
    values: Vec<(i32, &'static str)>,
}

impl EnumDescriptor {
    pub fn new(name: &'static str, values: Vec<(i32, &'static str)>) -> Self {
        Self { name, values }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn values(&self) -> &[(i32, &'static str)] {
        &self.values
    }

    /// Returns the declared name for a numeric value, if any.
    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        self.values
            .iter()
            .find(|(value, _)| *value == number)
            .map(|(_, name)| *name)
    }
}

/// The complete runtime description of one message type.
///
/// Fields are kept sorted by field number so that encoding emits them in
/// ascending order and lookup is a binary search.
#[derive(Clone, Debug)]
pub struct MessageDescriptor {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    oneofs: Vec<OneofDescriptor>,
    /// For each field (by sorted index), the index of the oneof it belongs
    /// to, if any.
    oneof_of: Vec<Option<usize>>,
}

impl MessageDescriptor {
    /// Builds a descriptor from field and oneof tables.
    ///
    /// # Panics
    ///
    /// Panics if a field number is zero, exceeds [`MAX_FIELD_NUMBER`], or is
    /// duplicated; if a oneof member does not name a declared field, names a
    /// repeated field, or belongs to more than one oneof. Descriptor tables
    /// come from generated code, so a violation is a schema bug caught at
    /// startup.
    pub fn new(
        name: &'static str,
        mut fields: Vec<FieldDescriptor>,
        oneofs: Vec<OneofDescriptor>,
    ) -> Self {
        fields.sort_by_key(|field| field.number);
        for pair in fields.windows(2) {
            assert!(
                pair[0].number != pair[1].number,
                "message {}: duplicate field number {}",
                name,
                pair[0].number,
            );
        }
        for field in &fields {
            assert!(
                (1..=MAX_FIELD_NUMBER).contains(&field.number),
                "message {}: field {} number {} out of range",
                name,
                field.name,
                field.number,
            );
        }

        let mut oneof_of = vec![None; fields.len()];
        for (group, oneof) in oneofs.iter().enumerate() {
            for &member in &oneof.members {
                let index = fields
                    .binary_search_by_key(&member, |field| field.number)
                    .unwrap_or_else(|_| {
                        panic!(
                            "message {}: oneof {} member {} is not a declared field",
                            name, oneof.name, member,
                        )
                    });
                assert!(
                    !fields[index].kind.is_repeated(),
                    "message {}: oneof {} member {} is repeated",
                    name,
                    oneof.name,
                    fields[index].name,
                );
                assert!(
                    oneof_of[index].is_none(),
                    "message {}: field {} belongs to more than one oneof",
                    name,
                    fields[index].name,
                );
                oneof_of[index] = Some(group);
            }
        }

        Self {
            name,
            fields,
            oneofs,
            oneof_of,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared fields, sorted by field number.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// Looks up a field by number.
    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.index_of(number).map(|index| &self.fields[index])
    }

    /// Returns the sorted-table index of a field number.
    #[inline]
    pub(crate) fn index_of(&self, number: u32) -> Option<usize> {
        self.fields
            .binary_search_by_key(&number, |field| field.number)
            .ok()
    }

    /// Returns the index of the oneof group the field at `index` belongs to,
    /// if any.
    #[inline]
    pub(crate) fn oneof_index(&self, index: usize) -> Option<usize> {
        self.oneof_of[index]
    }

    /// Returns the index of the named oneof group.
    pub(crate) fn oneof_position(&self, name: &str) -> Option<usize> {
        self.oneofs.iter().position(|oneof| oneof.name == name)
    }
}
