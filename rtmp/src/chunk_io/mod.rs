//! Serialization and deserialization of the RTMP chunk framing layer.
//!
//! Chunks are the smallest wire unit of an RTMP connection.  Every logical
//! message is cut into chunks no larger than the negotiated maximum chunk
//! size, and chunks belonging to different chunk streams may interleave
//! arbitrarily on the wire.  Both directions keep per chunk stream header
//! state, since all four header formats other than type 0 inherit fields from
//! the previous chunk on the same chunk stream id.

mod chunk_header;
mod deserialization_errors;
mod deserializer;
mod serialization_errors;
mod serializer;

pub use self::deserialization_errors::ChunkDeserializationError;
pub use self::deserializer::ChunkDeserializer;
pub use self::serialization_errors::ChunkSerializationError;
pub use self::serializer::{ChunkSerializer, Packet};
