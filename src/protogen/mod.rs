//! The `.proto` collaborator (SPEC_FULL.md §4.6): parses a small `.proto`
//! subset and renders Rust source implementing [`crate::message::StreamMessage`]
//! for each message, using this crate's schema bindings instead of runtime
//! reflection.
//!
//! This module is an ambient convenience, not part of the wire codec
//! itself — a [`crate::message::StreamMessage`] implementation can equally
//! well be hand-written, as every fixture under `tests/` is.

pub mod ast;
pub mod codegen;
pub mod parser;
pub mod tokens;

pub use ast::{Cardinality, Field, Message, Protobuf};
pub use codegen::render;
pub use parser::{parse, ParseError};
