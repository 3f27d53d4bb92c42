//! Per-kind value marshaling (SPEC_FULL.md §4.2).
//!
//! The shape of "one enum, one marshal function per kind" is grounded on
//! `examples/vimana-cloud-vimana/work/runtime/decode/scalar.rs`'s per-kind
//! merge dispatch, simplified down to the subset this codec supports and
//! stripped of the wasmtime component-model `Val` machinery that repo needs
//! and this one doesn't.

use std::borrow::Cow;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::schema::{ElementKind, WireType};
use crate::varint::{write_signed_varint, write_varint};

/// A fully type-erased submessage value, produced by the standard (non-
/// streaming) `prost` codec. Stored behind a trait object so [`Value`] does
/// not need to be generic over every submessage type a schema might use.
pub trait ErasedMessage: fmt::Debug + Send {
    fn encode_bytes(&self) -> Vec<u8>;
    fn clone_box(&self) -> Box<dyn ErasedMessage>;
}

impl Clone for Box<dyn ErasedMessage> {
    fn clone(&self) -> Self {
        self.as_ref().clone_box()
    }
}

/// Wraps a concrete `prost::Message` so it can be stored as an
/// [`ErasedMessage`].
#[derive(Debug, Clone)]
struct Wrapped<T>(T);

impl<T> ErasedMessage for Wrapped<T>
where
    T: prost::Message + Clone + fmt::Debug + 'static,
{
    fn encode_bytes(&self) -> Vec<u8> {
        self.0.encode_to_vec()
    }

    fn clone_box(&self) -> Box<dyn ErasedMessage> {
        Box::new(self.clone())
    }
}

/// Builds the [`crate::schema::SubMessageDecodeFn`] for a concrete
/// submessage type. Called once, while assembling a message type's static
/// [`crate::schema::Descriptor`].
pub fn submessage_decoder<T>(bytes: &[u8]) -> Result<Value, CodecError>
where
    T: prost::Message + Default + Clone + fmt::Debug + 'static,
{
    let msg = T::decode(bytes).map_err(|e| CodecError::Marshal(Box::new(e)))?;
    Ok(Value::SubMessage(Box::new(Wrapped(msg))))
}

/// Wraps a concrete submessage value (already decoded or freshly
/// constructed by the caller) as a [`Value::SubMessage`], for use on the
/// encode side.
pub fn submessage_value<T>(msg: T) -> Value
where
    T: prost::Message + Clone + fmt::Debug + 'static,
{
    Value::SubMessage(Box::new(Wrapped(msg)))
}

/// A typed field value flowing between the wire and a message instance's
/// presence cells / sequence endpoints.
#[derive(Debug, Clone)]
pub enum Value {
    /// Backed by the raw wire bytes, not a validated `String` — per
    /// SPEC_FULL.md §4.2, decode does not validate UTF-8.
    String(Bytes),
    Bytes(Bytes),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    SubMessage(Box<dyn ErasedMessage>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Bytes::from(s.into()))
    }

    pub fn bytes(b: impl Into<Bytes>) -> Self {
        Value::Bytes(b.into())
    }

    /// Lossily interprets a `String`-kind value as UTF-8, replacing invalid
    /// sequences rather than failing — the caller decides how much to trust
    /// wire-provided strings.
    pub fn as_str_lossy(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(b) => Some(String::from_utf8_lossy(b)),
            _ => None,
        }
    }

    /// Serializes this value's payload (the varint, or the length-delimited
    /// body without its own length prefix) according to `wire_type`.
    pub fn encode_payload(&self, wire_type: WireType, buf: &mut BytesMut) -> Result<(), CodecError> {
        match (self, wire_type) {
            (Value::Int32(v), WireType::Varint) => write_signed_varint(*v as i64, buf),
            (Value::Int64(v), WireType::Varint) => write_signed_varint(*v, buf),
            (Value::UInt32(v), WireType::Varint) => write_varint(*v as u64, buf),
            (Value::UInt64(v), WireType::Varint) => write_varint(*v, buf),
            (Value::Bool(v), WireType::Varint) => write_varint(*v as u64, buf),
            (Value::String(b), WireType::LengthDelimited) => {
                write_varint(b.len() as u64, buf);
                buf.put_slice(b);
            }
            (Value::Bytes(b), WireType::LengthDelimited) => {
                write_varint(b.len() as u64, buf);
                buf.put_slice(b);
            }
            (Value::SubMessage(m), WireType::LengthDelimited) => {
                let encoded = m.encode_bytes();
                write_varint(encoded.len() as u64, buf);
                buf.put_slice(&encoded);
            }
            _ => return Err(CodecError::SchemaMismatch("value/wire-type mismatch")),
        }
        Ok(())
    }

    /// Interprets a decoded varint payload as `kind`.
    pub fn from_varint(kind: ElementKind, raw: u64) -> Result<Value, CodecError> {
        match kind {
            ElementKind::Int32 => Ok(Value::Int32(raw as i64 as i32)),
            ElementKind::Int64 => Ok(Value::Int64(raw as i64)),
            ElementKind::UInt32 => {
                if raw > u32::MAX as u64 {
                    Err(CodecError::Overflow)
                } else {
                    Ok(Value::UInt32(raw as u32))
                }
            }
            ElementKind::UInt64 => Ok(Value::UInt64(raw)),
            ElementKind::Bool => Ok(Value::Bool(raw != 0)),
            ElementKind::String | ElementKind::Bytes | ElementKind::SubMessage(_) => {
                Err(CodecError::SchemaMismatch("varint frame for a length-delimited kind"))
            }
        }
    }

    /// Interprets a decoded length-delimited payload as `kind`.
    pub fn from_length_delimited(kind: ElementKind, raw: Bytes) -> Result<Value, CodecError> {
        match kind {
            ElementKind::String => Ok(Value::String(raw)),
            ElementKind::Bytes => Ok(Value::Bytes(raw)),
            ElementKind::SubMessage(decode) => decode(&raw),
            ElementKind::Int32
            | ElementKind::Int64
            | ElementKind::UInt32
            | ElementKind::UInt64
            | ElementKind::Bool => {
                Err(CodecError::SchemaMismatch("length-delimited frame for a varint kind"))
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::SubMessage(a), Value::SubMessage(b)) => a.encode_bytes() == b.encode_bytes(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trips_through_payload() {
        let v = Value::string("cat");
        let mut buf = BytesMut::new();
        v.encode_payload(WireType::LengthDelimited, &mut buf).unwrap();
        // length prefix (1 byte) + 3 payload bytes.
        assert_eq!(buf.len(), 4);
        assert_eq!(&buf[1..], b"cat");
    }

    #[test]
    fn int32_truncates_low_32_bits_on_decode() {
        // -1 as a 64-bit sign-extended varint payload.
        let raw: u64 = u64::MAX;
        let v = Value::from_varint(ElementKind::Int32, raw).unwrap();
        assert_eq!(v, Value::Int32(-1));
    }

    #[test]
    fn uint32_overflow_is_rejected() {
        let raw: u64 = (u32::MAX as u64) + 1;
        let err = Value::from_varint(ElementKind::UInt32, raw).unwrap_err();
        assert!(matches!(err, CodecError::Overflow));
    }

    #[test]
    fn bool_is_nonzero_test() {
        assert_eq!(Value::from_varint(ElementKind::Bool, 0).unwrap(), Value::Bool(false));
        assert_eq!(Value::from_varint(ElementKind::Bool, 42).unwrap(), Value::Bool(true));
    }

    #[test]
    fn kind_wire_type_mismatch_is_schema_mismatch() {
        let err = Value::from_varint(ElementKind::String, 0).unwrap_err();
        assert!(matches!(err, CodecError::SchemaMismatch(_)));
    }

    #[test]
    fn string_does_not_validate_utf8_on_decode() {
        let raw = Bytes::from_static(&[0xff, 0xfe]);
        let v = Value::from_length_delimited(ElementKind::String, raw.clone()).unwrap();
        assert_eq!(v, Value::String(raw));
    }
}
