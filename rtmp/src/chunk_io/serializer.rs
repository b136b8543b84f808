use super::chunk_header::{ChunkFormat, ChunkHeader};
use super::ChunkSerializationError;
use crate::messages::{MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::cmp::min;
use std::collections::HashMap;
use std::io::{Cursor, Write};

const INITIAL_MAX_CHUNK_SIZE: u32 = 128;
const MAX_ALLOWED_CHUNK_SIZE: u32 = 2147483647;
const MAX_MESSAGE_LENGTH: usize = 0xffffff;
const EXTENDED_TIMESTAMP_SENTINEL: u32 = 0xffffff;
const CONTROL_CHUNK_STREAM_ID: u32 = 2;

/// A fully framed outbound unit: one RTMP message cut into however many chunks
/// the current maximum chunk size requires.
#[derive(Debug, PartialEq)]
pub struct Packet {
    pub bytes: Vec<u8>,
}

/// Turns RTMP messages into chunk framed bytes ready for the wire.
///
/// The chunk format compresses headers against the previous chunk sent on the
/// same chunk stream id, so all traffic for one peer must flow through the
/// same serializer instance and be sent in the order it was produced.
pub struct ChunkSerializer {
    max_chunk_size: u32,
    previous_headers: HashMap<u32, ChunkHeader>,
}

impl ChunkSerializer {
    /// Creates a serializer with the protocol mandated initial maximum chunk
    /// size of 128 bytes.
    pub fn new() -> ChunkSerializer {
        ChunkSerializer {
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE,
            previous_headers: HashMap::new(),
        }
    }

    /// Changes the maximum outbound chunk size.
    ///
    /// The peer has to be told before larger chunks arrive, so this returns
    /// the framed `SetChunkSize` message.  That packet must be sent, and must
    /// be sent before anything serialized after this call.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Packet, ChunkSerializationError> {
        if new_size > MAX_ALLOWED_CHUNK_SIZE {
            return Err(ChunkSerializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        let message = RtmpMessage::SetChunkSize { size: new_size };
        let payload = MessagePayload::from_rtmp_message(message, time, 0)?;
        let packet = self.serialize(&payload, CONTROL_CHUNK_STREAM_ID, true)?;

        self.max_chunk_size = new_size;
        Ok(packet)
    }

    /// Serializes one message onto the given chunk stream id.
    ///
    /// The cheapest header format whose inherited fields still match the
    /// previous chunk on this chunk stream is chosen automatically, except
    /// that a timestamp lower than the previous chunk's forces a full header
    /// (deltas cannot run backwards, and some clients choke if it is
    /// attempted).  `force_uncompressed` additionally pins the full header
    /// format, which some encoders and players require for the first messages
    /// after a handshake.
    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        csid: u32,
        force_uncompressed: bool,
    ) -> Result<Packet, ChunkSerializationError> {
        if csid < 2 || csid > 65599 {
            return Err(ChunkSerializationError::InvalidChunkStreamId { csid });
        }

        if message.data.len() > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::MessageTooLong {
                size: message.data.len(),
            });
        }

        let mut header = ChunkHeader {
            chunk_stream_id: csid,
            timestamp: message.timestamp,
            timestamp_field: 0,
            message_length: message.data.len() as u32,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
        };

        let format = if force_uncompressed {
            ChunkFormat::Full
        } else {
            match self.previous_headers.get(&csid) {
                None => ChunkFormat::Full,
                Some(previous) => choose_format(&mut header, previous),
            }
        };

        // The receiver records the raw field of a full header as its repeat
        // value, the encoder has to mirror that or later format choices will
        // disagree with what the peer can resolve
        if format == ChunkFormat::Full {
            header.timestamp_field = header.timestamp.value;
        }

        let mut bytes = Cursor::new(Vec::new());
        write_chunk(&mut bytes, &header, format, &message.data, self.max_chunk_size)?;

        self.previous_headers.insert(csid, header);

        Ok(Packet {
            bytes: bytes.into_inner(),
        })
    }
}

/// Picks the smallest header format whose inherited fields all still match.
fn choose_format(header: &mut ChunkHeader, previous: &ChunkHeader) -> ChunkFormat {
    // A timestamp behind the previous chunk's cannot be expressed as a delta,
    // always fall back to a full header
    if header.timestamp < previous.timestamp {
        return ChunkFormat::Full;
    }

    if header.message_stream_id != previous.message_stream_id {
        return ChunkFormat::Full;
    }

    let delta = header.timestamp - previous.timestamp;
    header.timestamp_field = delta.value;

    if header.message_type_id != previous.message_type_id
        || header.message_length != previous.message_length
    {
        return ChunkFormat::InheritedStream;
    }

    if header.timestamp_field != previous.timestamp_field {
        return ChunkFormat::InheritedMessage;
    }

    ChunkFormat::InheritedAll
}

fn write_chunk(
    bytes: &mut Cursor<Vec<u8>>,
    header: &ChunkHeader,
    format: ChunkFormat,
    data: &[u8],
    max_chunk_size: u32,
) -> Result<(), ChunkSerializationError> {
    let timestamp_value = match format {
        ChunkFormat::Full => header.timestamp.value,
        _ => header.timestamp_field,
    };

    let extended_timestamp = if timestamp_value >= EXTENDED_TIMESTAMP_SENTINEL {
        Some(timestamp_value)
    } else {
        None
    };

    write_basic_header(bytes, format, header.chunk_stream_id)?;

    if format != ChunkFormat::InheritedAll {
        bytes.write_u24::<BigEndian>(min(timestamp_value, EXTENDED_TIMESTAMP_SENTINEL))?;
    }

    if format == ChunkFormat::Full || format == ChunkFormat::InheritedStream {
        bytes.write_u24::<BigEndian>(header.message_length)?;
        bytes.write_u8(header.message_type_id)?;
    }

    if format == ChunkFormat::Full {
        // The one little endian field of the chunk header
        bytes.write_u32::<LittleEndian>(header.message_stream_id)?;
    }

    if let Some(timestamp) = extended_timestamp {
        bytes.write_u32::<BigEndian>(timestamp)?;
    }

    // Payloads beyond the maximum chunk size continue in headerless type 3
    // chunks until the declared message length is exhausted
    let mut written = 0;
    loop {
        let slice_length = min(data.len() - written, max_chunk_size as usize);
        bytes.write_all(&data[written..written + slice_length])?;
        written += slice_length;

        if written >= data.len() {
            break;
        }

        write_basic_header(bytes, ChunkFormat::InheritedAll, header.chunk_stream_id)?;
        if let Some(timestamp) = extended_timestamp {
            bytes.write_u32::<BigEndian>(timestamp)?;
        }
    }

    Ok(())
}

fn write_basic_header(
    bytes: &mut dyn Write,
    format: ChunkFormat,
    csid: u32,
) -> Result<(), ChunkSerializationError> {
    let format_mask = match format {
        ChunkFormat::Full => 0b00000000,
        ChunkFormat::InheritedStream => 0b01000000,
        ChunkFormat::InheritedMessage => 0b10000000,
        ChunkFormat::InheritedAll => 0b11000000,
    };

    if csid <= 63 {
        bytes.write_u8(format_mask | csid as u8)?;
    } else if csid <= 319 {
        bytes.write_u8(format_mask)?;
        bytes.write_u8((csid - 64) as u8)?;
    } else {
        // Two extra little endian bytes
        bytes.write_u8(format_mask | 1)?;
        bytes.write_u8(((csid - 64) % 256) as u8)?;
        bytes.write_u8(((csid - 64) / 256) as u8)?;
    }

    Ok(())
}
