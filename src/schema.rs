//! The schema descriptor (SPEC_FULL.md §3): an immutable, field-number-keyed
//! table of bindings built once per message type from static metadata.

use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::message::{PresenceCell, RepeatedField};
use crate::value::Value;

/// Protobuf wire types this codec supports. Groups (3/4) and the fixed-width
/// types (1/5) are out of scope per SPEC_FULL.md §1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    LengthDelimited = 2,
}

impl WireType {
    pub fn from_u8(b: u8) -> Result<Self, CodecError> {
        match b {
            0 => Ok(WireType::Varint),
            2 => Ok(WireType::LengthDelimited),
            _ => Err(CodecError::SchemaMismatch("unsupported wire type")),
        }
    }
}

/// A function that decodes a length-delimited submessage payload into a
/// [`Value::SubMessage`]. Produced once per submessage type by
/// [`crate::value::submessage_codec`] and stored in the owning field's
/// [`ElementKind::SubMessage`].
pub type SubMessageDecodeFn = fn(&[u8]) -> Result<Value, CodecError>;

/// The logical kind of a field's element, independent of wire type (several
/// kinds share a wire type, e.g. `Bool`/`Int32`/`UInt64` are all varint).
#[derive(Clone, Copy)]
pub enum ElementKind {
    String,
    Bytes,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Bool,
    SubMessage(SubMessageDecodeFn),
}

impl ElementKind {
    pub fn wire_type(&self) -> WireType {
        match self {
            ElementKind::Int32
            | ElementKind::Int64
            | ElementKind::UInt32
            | ElementKind::UInt64
            | ElementKind::Bool => WireType::Varint,
            ElementKind::String | ElementKind::Bytes | ElementKind::SubMessage(_) => {
                WireType::LengthDelimited
            }
        }
    }
}

/// A singular field's binding: its element kind and a non-capturing
/// accessor to the presence cell on the message instance.
pub struct SingularBinding<M> {
    pub kind: ElementKind,
    pub cell: fn(&M) -> &PresenceCell,
}

/// A repeated field's binding: its element kind and a non-capturing
/// accessor to the sequence endpoint on the message instance.
pub struct RepeatedBinding<M> {
    pub kind: ElementKind,
    pub field: fn(&M) -> &RepeatedField,
}

/// A field binding, singular or repeated (SPEC_FULL.md §3).
pub enum FieldBinding<M> {
    Singular(SingularBinding<M>),
    Repeated(RepeatedBinding<M>),
}

impl<M> FieldBinding<M> {
    pub fn kind(&self) -> ElementKind {
        match self {
            FieldBinding::Singular(s) => s.kind,
            FieldBinding::Repeated(r) => r.kind,
        }
    }

    pub fn wire_type(&self) -> WireType {
        self.kind().wire_type()
    }
}

/// An immutable per-message-type table mapping field number to binding.
/// Field numbers are stored in a [`BTreeMap`] so ascending iteration (the
/// order the encoder's singular prologue requires) is just iteration.
pub struct Descriptor<M> {
    fields: BTreeMap<u32, FieldBinding<M>>,
}

impl<M> Descriptor<M> {
    pub fn new(fields: BTreeMap<u32, FieldBinding<M>>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field_number: u32) -> Option<&FieldBinding<M>> {
        self.fields.get(&field_number)
    }

    /// Iterates bindings in ascending field-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldBinding<M>)> {
        self.fields.iter().map(|(&n, b)| (n, b))
    }
}
