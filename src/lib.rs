//! A streaming, wire-compatible protobuf codec: repeated fields flow over
//! async sequences instead of materializing as vectors (SPEC_FULL.md §1).

pub mod banner;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod logging;
pub mod message;
pub mod protogen;
pub mod schema;
pub mod value;
pub mod varint;

pub use decode::decode;
pub use encode::encode;
pub use error::CodecError;
pub use message::{MessageCore, PresenceCell, RepeatedField, StreamMessage};
pub use schema::{Descriptor, ElementKind, FieldBinding, RepeatedBinding, SingularBinding, WireType};
pub use value::Value;
