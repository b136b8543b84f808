//! This crate provides functionality for serializing and deserializing data
//! based on the Adobe AMF0 encoding specification, as used by the RTMP command
//! protocol.
//!
//! Unlike a general purpose serializer, object properties are kept as *ordered*
//! name/value pairs.  RTMP peers are sensitive to property order in command
//! objects, so a round-trip through this crate reproduces the original ordering.
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use mms_amf0::{Amf0Value, serialize, deserialize};
//!
//! let object = Amf0Value::Object(vec![
//!     ("app".to_string(), Amf0Value::Utf8String("live".to_string())),
//!     ("tcUrl".to_string(), Amf0Value::Utf8String("rtmp://localhost/live".to_string())),
//! ]);
//!
//! let input = vec![Amf0Value::Utf8String("connect".to_string()), Amf0Value::Number(1.0), object];
//! let bytes = serialize(&input).unwrap();
//!
//! let mut cursor = Cursor::new(bytes);
//! let output = deserialize(&mut cursor).unwrap();
//! assert_eq!(input, output);
//! ```

mod deserialization;
mod errors;
mod serialization;

pub use crate::deserialization::deserialize;
pub use crate::errors::{Amf0DeserializationError, Amf0SerializationError};
pub use crate::serialization::serialize;

/// An enum representing all AMF0 value types this crate understands.
///
/// Any type tag outside this set causes deserialization to stop and surface an
/// `Unsupported` value in place of the remainder of the buffer.
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),

    /// Strings longer than 65,535 bytes use a 4 byte length prefix on the wire.
    /// Serialization promotes an oversized `Utf8String` to this encoding
    /// automatically.
    LongUtf8String(String),

    /// Ordered name/value pairs
    Object(Vec<(String, Amf0Value)>),

    /// Same wire shape as an object plus a (recomputed on write, untrusted on
    /// read) element count prefix
    EcmaArray(Vec<(String, Amf0Value)>),

    /// Ordered unnamed values
    StrictArray(Vec<Amf0Value>),

    Null,
    Undefined,

    /// Index into the peer's reference table.  Carried through but never
    /// resolved by this crate.
    Reference(u16),

    /// Milliseconds since the unix epoch.  The wire format carries a two byte
    /// timezone field which is always written as zero and ignored on read.
    Date(f64),

    Unsupported,
}

impl Amf0Value {
    pub fn get_number(self) -> Option<f64> {
        match self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_boolean(self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string(self) -> Option<String> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            Amf0Value::LongUtf8String(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_object_properties(self) -> Option<Vec<(String, Amf0Value)>> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }

    /// Looks up a named property of an object or ecma array, first match wins.
    pub fn get_property(&self, name: &str) -> Option<&Amf0Value> {
        match self {
            Amf0Value::Object(properties) | Amf0Value::EcmaArray(properties) => properties
                .iter()
                .find(|(label, _)| label == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

mod markers {
    pub const NUMBER_MARKER: u8 = 0x00;
    pub const BOOLEAN_MARKER: u8 = 0x01;
    pub const STRING_MARKER: u8 = 0x02;
    pub const OBJECT_MARKER: u8 = 0x03;
    pub const NULL_MARKER: u8 = 0x05;
    pub const UNDEFINED_MARKER: u8 = 0x06;
    pub const REFERENCE_MARKER: u8 = 0x07;
    pub const ECMA_ARRAY_MARKER: u8 = 0x08;
    pub const OBJECT_END_MARKER: u8 = 0x09;
    pub const STRICT_ARRAY_MARKER: u8 = 0x0a;
    pub const DATE_MARKER: u8 = 0x0b;
    pub const LONG_STRING_MARKER: u8 = 0x0c;
    pub const UNSUPPORTED_MARKER: u8 = 0x0d;
    pub const UTF_8_EMPTY_MARKER: u16 = 0;
}
