//! Wireform encoding, decoding, and build errors.

use core::fmt;

/// Wireform message decoding error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// A declared length exceeds the bytes remaining in the current message's
    /// range, or a fixed-width payload was cut short.
    Truncated,
    /// A varint ran past its 10-byte maximum, overflowed 64 bits, or the
    /// input ended before its terminating byte.
    MalformedVarint,
    /// A field key carried wire type 3 or 4 (deprecated group markers) or a
    /// reserved wire-type value.
    UnsupportedWireType,
    /// A field key encoded field number zero or one beyond the supported
    /// range.
    InvalidTag,
    /// Size of a length-delimited region exceeds what is addressable on this
    /// platform.
    Oversize,
    /// Nested messages exceeded the decode recursion limit.
    RecursionLimitReached,
}

use DecodeErrorKind::*;

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Truncated => "message or field truncated",
            MalformedVarint => "malformed varint",
            UnsupportedWireType => "unsupported wire type",
            InvalidTag => "invalid field tag",
            Oversize => "region too large to decode",
            RecursionLimitReached => "recursion limit reached",
        })
    }
}

/// A wire decoding error.
///
/// `DecodeError` indicates that the input does not contain a valid message
/// for the descriptor it was decoded against. The error details should be
/// considered 'best effort': malformed input aborts the merge at the first
/// byte that cannot be interpreted, and a builder that was being merged into
/// may be left partially updated.
///
/// With the "detailed-errors" feature enabled the error also records the
/// `(message, field)` name pairs along the path where decoding failed.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// A 'best effort' root cause description.
    kind: DecodeErrorKind,
    #[cfg(feature = "detailed-errors")]
    /// A stack of (message, field) name pairs, one entry per level of
    /// nesting, innermost first.
    stack: thin_vec::ThinVec<(&'static str, &'static str)>,
}

impl DecodeError {
    /// Creates a new `DecodeError` with a 'best effort' root cause
    /// description.
    #[cold]
    pub(crate) fn new(kind: DecodeErrorKind) -> DecodeError {
        DecodeError {
            kind,
            #[cfg(feature = "detailed-errors")]
            stack: Default::default(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Pushes a (message, field) name location pair on to the location
    /// stack.
    pub(crate) fn push(&mut self, message: &'static str, field: &'static str) {
        #[cfg(feature = "detailed-errors")]
        self.stack.push((message, field));
        _ = (message, field);
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DecodeError");
        s.field("description", &self.kind);
        #[cfg(feature = "detailed-errors")]
        s.field("stack", &self.stack);
        s.finish()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode message: ")?;
        #[cfg(feature = "detailed-errors")]
        for (message, field) in self.stack.iter().rev() {
            write!(f, "{}.{}: ", message, field)?;
        }
        self.kind.fmt(f)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

#[cfg(feature = "std")]
impl From<DecodeError> for std::io::Error {
    fn from(error: DecodeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidData, error)
    }
}

/// A message encoding error.
///
/// `EncodeError` always indicates that a message failed to encode because the
/// provided buffer had insufficient capacity. Message encoding is otherwise
/// infallible.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodeError {
    required: usize,
    remaining: usize,
}

impl EncodeError {
    /// Creates a new `EncodeError`.
    pub(crate) fn new(required: usize, remaining: usize) -> EncodeError {
        EncodeError {
            required,
            remaining,
        }
    }

    /// Returns the required buffer capacity to encode the message.
    pub fn required_capacity(&self) -> usize {
        self.required
    }

    /// Returns the remaining length in the provided buffer at the time of
    /// encoding.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to encode message; insufficient buffer capacity \
            (required: {}, remaining: {})",
            self.required, self.remaining
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

#[cfg(feature = "std")]
impl From<EncodeError> for std::io::Error {
    fn from(error: EncodeError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
    }
}

/// A message build error.
///
/// Returned by [`Builder::build`](crate::Builder::build) when a
/// declared-required invariant of the message's schema is unsatisfied. None
/// of the field kinds currently expressible in a
/// [`MessageDescriptor`](crate::MessageDescriptor) declare required fields,
/// so building cannot fail in practice; the type is the reserved surface for
/// schemas that do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildError {
    message_name: &'static str,
}

impl BuildError {
    /// Creates a new `BuildError` for the named message type.
    pub fn new(message_name: &'static str) -> BuildError {
        BuildError { message_name }
    }

    /// Returns the name of the message type that failed to build.
    pub fn message_name(&self) -> &'static str {
        self.message_name
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to build message {}: required fields are unset",
            self.message_name
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BuildError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn decode_error_reports_kind() {
        let err = DecodeError::new(DecodeErrorKind::Truncated);
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
        assert_eq!(
            format!("{}", err),
            "failed to decode message: message or field truncated"
        );
    }

    #[cfg(feature = "detailed-errors")]
    #[test]
    fn decode_error_stack_renders_outermost_first() {
        let mut err = DecodeError::new(DecodeErrorKind::MalformedVarint);
        err.push("Address", "city");
        err.push("User", "addresses");
        assert_eq!(
            format!("{}", err),
            "failed to decode message: User.addresses: Address.city: malformed varint"
        );
    }

    #[test]
    fn build_error_names_the_message() {
        let err = BuildError::new("User");
        assert_eq!(err.message_name(), "User");
        assert_eq!(
            format!("{}", err),
            "failed to build message User: required fields are unset"
        );
    }
}
