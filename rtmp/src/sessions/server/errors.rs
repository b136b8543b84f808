use crate::chunk_io::{ChunkDeserializationError, ChunkSerializationError};
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use thiserror::Error;

/// Errors a server session can encounter.  Chunk level failures are fatal to
/// the connection; command level oddities are handled leniently inside the
/// session and never surface here.
#[derive(Debug, Error)]
pub enum ServerSessionError {
    #[error("Failed to deserialize incoming chunk data: {0}")]
    ChunkDeserialization(#[from] ChunkDeserializationError),

    #[error("Failed to serialize an outbound message into chunks: {0}")]
    ChunkSerialization(#[from] ChunkSerializationError),

    #[error("Failed to serialize an outbound message payload: {0}")]
    MessageSerialization(#[from] MessageSerializationError),

    #[error("Failed to deserialize a message payload: {0}")]
    MessageDeserialization(#[from] MessageDeserializationError),

    /// A `connect` command arrived without the command object the protocol
    /// requires
    #[error("The connect command did not carry a command object")]
    NoConnectCommandObject,
}
