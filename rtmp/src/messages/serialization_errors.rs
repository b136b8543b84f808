use mms_amf0::Amf0SerializationError;
use std::io;
use thiserror::Error;

/// Errors raised while encoding an `RtmpMessage` into payload bytes.
#[derive(Debug, Error)]
pub enum MessageSerializationError {
    #[error("Failed to serialize amf0 values: {0}")]
    Amf0SerializationError(#[from] Amf0SerializationError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
