use mms_amf0::Amf0DeserializationError;
use std::io;
use thiserror::Error;

/// Errors raised while decoding a message payload into an `RtmpMessage`.
#[derive(Debug, Error)]
pub enum MessageDeserializationError {
    /// The payload bytes did not match the wire format the message's type id
    /// requires
    #[error("The message payload does not match the format required by its type id")]
    InvalidMessageFormat,

    #[error("Failed to deserialize amf0 values: {0}")]
    Amf0DeserializationError(#[from] Amf0DeserializationError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
