use std::{io, string};
use thiserror::Error;

/// Errors raised while decoding bytes into AMF0 values.
///
/// An unknown type marker is deliberately *not* represented here.  Encountering
/// one stops the parse and yields an `Amf0Value::Unsupported` sentinel instead,
/// since the rest of the buffer can no longer be framed.
#[derive(Debug, Error)]
pub enum Amf0DeserializationError {
    /// An object property had a zero length name but was not followed by the
    /// object end marker
    #[error("Object property with an empty name was not the object terminator")]
    UnexpectedEmptyObjectPropertyName,

    /// The buffer ended in the middle of a value
    #[error("Hit the end of the byte buffer but was expecting more data")]
    UnexpectedEof,

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    FromUtf8Error(#[from] string::FromUtf8Error),
}

/// Errors raised while encoding AMF0 values into bytes.
#[derive(Debug, Error)]
pub enum Amf0SerializationError {
    /// Object property names only get a 2 byte length prefix on the wire
    #[error("Object property name length greater than 65,535")]
    PropertyNameTooLong,

    #[error("{0}")]
    Io(#[from] io::Error),
}
