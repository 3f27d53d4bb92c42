//! Parsed `.proto` schema, independent of how it was read or how it will
//! be rendered (SPEC_FULL.md §4.6).

/// Whether a field is `repeated` or singular (`required`/unmarked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Repeated,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub number: u32,
    pub type_name: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub fields: Vec<Field>,
    pub sub_messages: Vec<Message>,
}

#[derive(Debug, Clone, Default)]
pub struct Protobuf {
    pub package: String,
    pub messages: Vec<Message>,
}
