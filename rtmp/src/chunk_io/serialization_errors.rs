use crate::messages::MessageSerializationError;
use std::io;
use thiserror::Error;

/// Errors that can occur while serializing messages into RTMP chunks.
#[derive(Debug, Error)]
pub enum ChunkSerializationError {
    /// A message length has to fit the 3 byte length field of a chunk header
    #[error("Message of {size} bytes is too long to fit in a chunk header")]
    MessageTooLong { size: usize },

    /// The maximum chunk size is carried in 31 bits of the SetChunkSize
    /// message, larger values cannot be represented
    #[error("Requested invalid max chunk size of {chunk_size} (maximum is 2147483647)")]
    InvalidMaxChunkSize { chunk_size: u32 },

    /// Chunk stream ids 0 and 1 are reserved for the extended basic header
    /// encodings, and ids above 65599 cannot be encoded at all
    #[error("Chunk stream id {csid} is outside the encodable range of 2 through 65599")]
    InvalidChunkStreamId { csid: u32 },

    #[error("{0}")]
    MessageSerialization(#[from] MessageSerializationError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
