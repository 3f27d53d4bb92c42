//! Renders a parsed schema as Rust source implementing [`StreamMessage`]
//! for each message, using this crate's fn-pointer descriptor bindings.
//!
//! The original generator (`original_source/proto-gen/go_stream_printer.go`)
//! emits a Go struct with one channel field per repeated field and
//! hand-rolled `Errors()`/`Closed()`/`Close()` methods. Here, those are
//! `PresenceCell`/`RepeatedField` members plus a [`Descriptor`] built once
//! behind a `OnceLock`, since that's how this crate's bindings work
//! (SPEC_FULL.md §9: "compile-time generated bindings" replacing runtime
//! reflection).
//!
//! [`StreamMessage`]: crate::message::StreamMessage
//! [`Descriptor`]: crate::schema::Descriptor

use std::fmt::Write as _;

use super::ast::{Cardinality, Field, Message, Protobuf};

fn scalar_kind(type_name: &str) -> Option<&'static str> {
    match type_name {
        "string" => Some("ElementKind::String"),
        "bytes" => Some("ElementKind::Bytes"),
        "int32" => Some("ElementKind::Int32"),
        "int64" => Some("ElementKind::Int64"),
        "uint32" => Some("ElementKind::UInt32"),
        "uint64" => Some("ElementKind::UInt64"),
        "bool" => Some("ElementKind::Bool"),
        _ => None,
    }
}

fn rust_type_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn field_element_kind(field: &Field) -> String {
    match scalar_kind(&field.type_name) {
        Some(kind) => kind.to_string(),
        None => format!(
            "ElementKind::SubMessage(crate::value::submessage_decoder::<{}>)",
            rust_type_name(&field.type_name)
        ),
    }
}

fn render_message(out: &mut String, message: &Message) {
    let name = rust_type_name(&message.name);

    writeln!(out, "#[derive(Default)]").unwrap();
    writeln!(out, "pub struct {name} {{").unwrap();
    writeln!(out, "    core: crate::message::MessageCore,").unwrap();
    for field in &message.fields {
        let member = &field.name;
        match field.cardinality {
            Cardinality::Singular => {
                writeln!(out, "    pub {member}: crate::message::PresenceCell,").unwrap()
            }
            Cardinality::Repeated => {
                writeln!(out, "    pub {member}: crate::message::RepeatedField,").unwrap()
            }
        }
    }
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "impl crate::message::StreamMessage for {name} {{").unwrap();
    writeln!(
        out,
        "    fn descriptor() -> &'static crate::schema::Descriptor<Self> {{"
    )
    .unwrap();
    writeln!(
        out,
        "        static DESC: std::sync::OnceLock<crate::schema::Descriptor<{name}>> = std::sync::OnceLock::new();"
    )
    .unwrap();
    writeln!(out, "        DESC.get_or_init(|| {{").unwrap();
    writeln!(out, "            let mut fields = std::collections::BTreeMap::new();").unwrap();
    for field in &message.fields {
        let kind = field_element_kind(field);
        let number = field.number;
        let member = &field.name;
        match field.cardinality {
            Cardinality::Singular => {
                writeln!(out, "            fields.insert({number}, crate::schema::FieldBinding::Singular(crate::schema::SingularBinding {{").unwrap();
                writeln!(out, "                kind: crate::schema::{kind},").unwrap();
                writeln!(out, "                cell: |m: &{name}| &m.{member},").unwrap();
                writeln!(out, "            }}));").unwrap();
            }
            Cardinality::Repeated => {
                writeln!(out, "            fields.insert({number}, crate::schema::FieldBinding::Repeated(crate::schema::RepeatedBinding {{").unwrap();
                writeln!(out, "                kind: crate::schema::{kind},").unwrap();
                writeln!(out, "                field: |m: &{name}| &m.{member},").unwrap();
                writeln!(out, "            }}));").unwrap();
            }
        }
    }
    writeln!(out, "            crate::schema::Descriptor::new(fields)").unwrap();
    writeln!(out, "        }})").unwrap();
    writeln!(out, "    }}\n").unwrap();
    writeln!(out, "    fn core(&self) -> &crate::message::MessageCore {{").unwrap();
    writeln!(out, "        &self.core").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}\n").unwrap();

    for sub in &message.sub_messages {
        render_message(out, sub);
    }
}

/// Renders every message in `pb` as a standalone Rust module body. The
/// caller is responsible for wrapping the result in a `mod { ... }` block
/// and wiring it into the crate, or writing it to its own file.
pub fn render(pb: &Protobuf) -> String {
    let mut out = String::new();
    writeln!(out, "// Generated from package `{}`.", pb.package).unwrap();
    writeln!(out, "#![allow(unused_imports)]").unwrap();
    writeln!(out, "use crate::schema::ElementKind;\n").unwrap();
    for message in &pb.messages {
        render_message(&mut out, message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protogen::parser::parse;

    #[test]
    fn renders_a_struct_per_message() {
        let src = r#"
            package chat;
            message ChatMessage {
                string from = 1;
                string body = 2;
            }
        "#;
        let pb = parse(src.as_bytes()).unwrap();
        let rendered = render(&pb);
        assert!(rendered.contains("pub struct ChatMessage"));
        assert!(rendered.contains("cell: |m: &ChatMessage| &m.from"));
        assert!(rendered.contains("ElementKind::String"));
    }

    #[test]
    fn repeated_submessage_field_uses_submessage_decoder() {
        let src = r#"
            package chat;
            message ChatRoom {
                string name = 1;
                repeated ChatMessage messages = 2;
                message ChatMessage {
                    string body = 1;
                }
            }
        "#;
        let pb = parse(src.as_bytes()).unwrap();
        let rendered = render(&pb);
        assert!(rendered.contains("crate::message::RepeatedField"));
        assert!(rendered.contains("submessage_decoder::<ChatMessage>"));
    }
}
