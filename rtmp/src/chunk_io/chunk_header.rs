use crate::time::RtmpTimestamp;

/// The four chunk header formats, selected by the top two bits of the basic
/// header.  Everything except `Full` inherits unspecified fields from the
/// previous chunk on the same chunk stream id.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum ChunkFormat {
    /// Type 0: absolute timestamp, length, type id and message stream id
    Full,

    /// Type 1: timestamp delta, length and type id; stream id inherited
    InheritedStream,

    /// Type 2: timestamp delta only
    InheritedMessage,

    /// Type 3: basic header only, everything inherited
    InheritedAll,
}

/// The header state tracked per chunk stream id, in each direction.
#[derive(Debug, Clone)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,
    pub timestamp: RtmpTimestamp,

    /// The raw value of the last timestamp field on this chunk stream: an
    /// absolute time after a type 0 chunk, a delta after types 1 and 2.  Type
    /// 3 chunks repeat it.
    pub timestamp_field: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
}

impl ChunkHeader {
    pub fn new() -> ChunkHeader {
        ChunkHeader {
            chunk_stream_id: 0,
            timestamp: RtmpTimestamp::new(0),
            timestamp_field: 0,
            message_length: 0,
            message_type_id: 0,
            message_stream_id: 0,
        }
    }
}
