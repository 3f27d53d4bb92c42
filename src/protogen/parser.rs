//! Recursive-descent parser for the `.proto` subset this crate understands:
//! a `package` declaration followed by `message` blocks, each holding
//! scalar/submessage fields and nested `message`s.
//!
//! Grounded on `original_source/proto-gen/main.go`'s `ParseProtoFile` /
//! `ParseMessage` / `ParseField`.

use std::io::Read;

use thiserror::Error;

use super::ast::{Cardinality, Field, Message, Protobuf};
use super::tokens::TokenReader;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of input while parsing {0}")]
    UnexpectedEof(&'static str),
    #[error("expected {expected:?}, found {found:?}")]
    Unexpected { expected: &'static str, found: String },
    #[error("invalid field number {0:?}")]
    InvalidFieldNumber(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn expect(reader: &mut TokenReader<impl Read>, expected: &'static str) -> Result<(), ParseError> {
    let tok = reader
        .next_token()?
        .ok_or(ParseError::UnexpectedEof(expected))?;
    if tok != expected {
        return Err(ParseError::Unexpected { expected, found: tok });
    }
    Ok(())
}

fn next(reader: &mut TokenReader<impl Read>, context: &'static str) -> Result<String, ParseError> {
    reader.next_token()?.ok_or(ParseError::UnexpectedEof(context))
}

fn parse_field(reader: &mut TokenReader<impl Read>, cardinality: Cardinality) -> Result<Field, ParseError> {
    let type_name = next(reader, "field type")?;
    let name = next(reader, "field name")?;
    expect(reader, "=")?;
    let number_tok = next(reader, "field number")?;
    let number = number_tok
        .parse()
        .map_err(|_| ParseError::InvalidFieldNumber(number_tok))?;
    expect(reader, ";")?;
    Ok(Field {
        name,
        number,
        type_name,
        cardinality,
    })
}

fn parse_message(reader: &mut TokenReader<impl Read>) -> Result<Message, ParseError> {
    let name = next(reader, "message name")?;
    expect(reader, "{")?;

    let mut message = Message {
        name,
        fields: Vec::new(),
        sub_messages: Vec::new(),
    };

    loop {
        let tok = next(reader, "message body")?;
        match tok.as_str() {
            "}" => return Ok(message),
            "repeated" => message.fields.push(parse_field(reader, Cardinality::Repeated)?),
            "required" | "optional" => message.fields.push(parse_field(reader, Cardinality::Singular)?),
            "message" => message.sub_messages.push(parse_message(reader)?),
            other => {
                return Err(ParseError::Unexpected {
                    expected: "a field, nested message, or closing brace",
                    found: other.to_string(),
                })
            }
        }
    }
}

/// Parses a full `.proto`-subset source: one optional `package` statement
/// followed by any number of top-level `message` blocks.
pub fn parse(source: impl Read) -> Result<Protobuf, ParseError> {
    let mut reader = TokenReader::new(source);
    let mut pb = Protobuf::default();

    while let Some(tok) = reader.next_token()? {
        match tok.as_str() {
            "package" => {
                pb.package = next(&mut reader, "package name")?;
                expect(&mut reader, ";")?;
            }
            "message" => pb.messages.push(parse_message(&mut reader)?),
            other => {
                return Err(ParseError::Unexpected {
                    expected: "\"package\" or \"message\"",
                    found: other.to_string(),
                })
            }
        }
    }

    Ok(pb)
}
