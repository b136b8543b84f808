use std::io;
use thiserror::Error;

/// Errors that can occur while deserializing RTMP chunks.  Running out of
/// bytes mid chunk is *not* an error; the deserializer holds its partial state
/// and reports "no message yet" instead.
#[derive(Debug, Error)]
pub enum ChunkDeserializationError {
    /// Chunk header types 1 through 3 inherit fields from the previous chunk
    /// on the same chunk stream id, so receiving one before any type 0 chunk
    /// on that id cannot be resolved
    #[error("Received a delta encoded chunk on csid {csid} before any full header chunk")]
    NoPreviousChunkOnStream { csid: u32 },

    /// The maximum chunk size is carried in 31 bits of the SetChunkSize
    /// message, larger values cannot be represented
    #[error("Requested invalid max chunk size of {chunk_size} (maximum is 2147483647)")]
    InvalidMaxChunkSize { chunk_size: usize },

    #[error("{0}")]
    Io(#[from] io::Error),
}
