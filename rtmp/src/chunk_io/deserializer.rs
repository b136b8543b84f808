use super::chunk_header::{ChunkFormat, ChunkHeader};
use super::ChunkDeserializationError;
use crate::messages::MessagePayload;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::BytesMut;
use std::cmp::min;
use std::collections::HashMap;
use std::io::Cursor;
use std::mem;

const INITIAL_MAX_CHUNK_SIZE: usize = 128;
const MAX_ALLOWED_CHUNK_SIZE: usize = 2147483647;
const EXTENDED_TIMESTAMP_SENTINEL: u32 = 0xffffff;

/// The per chunk stream receive state: the inheritable header fields plus the
/// partial reassembly buffer for a message still being collected.
struct ChunkStream {
    header: ChunkHeader,
    assembly: BytesMut,
}

impl ChunkStream {
    fn new(csid: u32) -> ChunkStream {
        let mut header = ChunkHeader::new();
        header.chunk_stream_id = csid;

        ChunkStream {
            header,
            assembly: BytesMut::new(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Copy, Clone)]
enum DecodeStage {
    BasicHeader,
    MessageHeader,
    ExtendedTimestamp,
    Payload,
}

#[derive(Eq, PartialEq, Debug)]
enum StepResult {
    Continue,
    NeedMoreBytes,
}

/// Turns bytes representing RTMP chunks back into complete RTMP messages.
///
/// Every byte arriving on a connection after the handshake must pass through
/// the same deserializer instance, since chunks lean on header state from the
/// chunks before them.  Decoding is fully incremental: a short read at any
/// point leaves the internal state intact and simply yields no message.
///
/// Chunks from different chunk stream ids may interleave on the wire, so the
/// deserializer keeps an independent reassembly buffer per chunk stream id and
/// interleaving never corrupts an in-progress message.
pub struct ChunkDeserializer {
    max_chunk_size: usize,
    buffer: BytesMut,
    stage: DecodeStage,
    current_csid: u32,
    current_format: ChunkFormat,
    pending_timestamp_field: u32,
    streams: HashMap<u32, ChunkStream>,
}

impl ChunkDeserializer {
    /// Creates a deserializer expecting the protocol mandated initial maximum
    /// chunk size of 128 bytes.
    pub fn new() -> ChunkDeserializer {
        ChunkDeserializer {
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE,
            buffer: BytesMut::with_capacity(4096),
            stage: DecodeStage::BasicHeader,
            current_csid: 0,
            current_format: ChunkFormat::Full,
            pending_timestamp_field: 0,
            streams: HashMap::new(),
        }
    }

    /// Attempts to read the next complete RTMP message from the passed in
    /// bytes (plus anything left over from previous calls).
    ///
    /// Bytes are consumed exactly once, so pass an empty slice on subsequent
    /// calls until `None` comes back, then feed the next socket read.  If the
    /// returned message is a `SetChunkSize` the new size must be applied via
    /// [`set_max_chunk_size`](ChunkDeserializer::set_max_chunk_size) before
    /// the next call, or chunk boundaries will be misread.
    pub fn get_next_message(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<MessagePayload>, ChunkDeserializationError> {
        self.buffer.extend_from_slice(bytes);

        loop {
            let mut message = None;
            let result = match self.stage {
                DecodeStage::BasicHeader => self.parse_basic_header()?,
                DecodeStage::MessageHeader => self.parse_message_header()?,
                DecodeStage::ExtendedTimestamp => self.parse_extended_timestamp()?,
                DecodeStage::Payload => self.parse_payload(&mut message)?,
            };

            if result == StepResult::NeedMoreBytes || message.is_some() {
                return Ok(message);
            }
        }
    }

    /// Applies a new maximum inbound chunk size, normally in reaction to a
    /// `SetChunkSize` message from the peer.
    pub fn set_max_chunk_size(&mut self, new_size: usize) -> Result<(), ChunkDeserializationError> {
        if new_size > MAX_ALLOWED_CHUNK_SIZE {
            return Err(ChunkDeserializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        self.max_chunk_size = new_size;
        Ok(())
    }

    /// Discards any partial message reassembly on the given chunk stream id,
    /// as requested by an `Abort` control message.  Header inheritance state
    /// for the chunk stream is kept.
    pub fn abort(&mut self, csid: u32) {
        if let Some(stream) = self.streams.get_mut(&csid) {
            stream.assembly.clear();
        }
    }

    fn parse_basic_header(&mut self) -> Result<StepResult, ChunkDeserializationError> {
        const FORMAT_MASK: u8 = 0b11000000;
        const CSID_MASK: u8 = 0b00111111;

        if self.buffer.is_empty() {
            return Ok(StepResult::NeedMoreBytes);
        }

        let first_byte = self.buffer[0];
        let format = match first_byte & FORMAT_MASK {
            0b00000000 => ChunkFormat::Full,
            0b01000000 => ChunkFormat::InheritedStream,
            0b10000000 => ChunkFormat::InheritedMessage,
            _ => ChunkFormat::InheritedAll,
        };

        let (csid, header_size) = match first_byte & CSID_MASK {
            0 => {
                if self.buffer.len() < 2 {
                    return Ok(StepResult::NeedMoreBytes);
                }

                (self.buffer[1] as u32 + 64, 2)
            }

            1 => {
                if self.buffer.len() < 3 {
                    return Ok(StepResult::NeedMoreBytes);
                }

                // Two extra little endian bytes
                (self.buffer[1] as u32 + self.buffer[2] as u32 * 256 + 64, 3)
            }

            x => (x as u32, 1),
        };

        if format == ChunkFormat::Full {
            self.streams
                .entry(csid)
                .or_insert_with(|| ChunkStream::new(csid));
        } else if !self.streams.contains_key(&csid) {
            return Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid });
        }

        let _ = self.buffer.split_to(header_size);
        self.current_csid = csid;
        self.current_format = format;
        self.stage = DecodeStage::MessageHeader;
        Ok(StepResult::Continue)
    }

    fn parse_message_header(&mut self) -> Result<StepResult, ChunkDeserializationError> {
        let header_size = match self.current_format {
            ChunkFormat::Full => 11,
            ChunkFormat::InheritedStream => 7,
            ChunkFormat::InheritedMessage => 3,
            ChunkFormat::InheritedAll => 0,
        };

        if self.buffer.len() < header_size {
            return Ok(StepResult::NeedMoreBytes);
        }

        let stream = current_stream(&mut self.streams, self.current_csid);
        match self.current_format {
            ChunkFormat::Full => {
                let mut cursor = Cursor::new(self.buffer.split_to(header_size));
                self.pending_timestamp_field = cursor.read_u24::<BigEndian>()?;
                stream.header.message_length = cursor.read_u24::<BigEndian>()?;
                stream.header.message_type_id = cursor.read_u8()?;

                // The message stream id is the one little endian field of the
                // chunk header
                stream.header.message_stream_id = cursor.read_u32::<LittleEndian>()?;
            }

            ChunkFormat::InheritedStream => {
                let mut cursor = Cursor::new(self.buffer.split_to(header_size));
                self.pending_timestamp_field = cursor.read_u24::<BigEndian>()?;
                stream.header.message_length = cursor.read_u24::<BigEndian>()?;
                stream.header.message_type_id = cursor.read_u8()?;
            }

            ChunkFormat::InheritedMessage => {
                let mut cursor = Cursor::new(self.buffer.split_to(header_size));
                self.pending_timestamp_field = cursor.read_u24::<BigEndian>()?;
            }

            ChunkFormat::InheritedAll => {
                self.pending_timestamp_field = stream.header.timestamp_field;
            }
        }

        if self.pending_timestamp_field >= EXTENDED_TIMESTAMP_SENTINEL {
            self.stage = DecodeStage::ExtendedTimestamp;
        } else {
            self.apply_timestamp();
            self.stage = DecodeStage::Payload;
        }

        Ok(StepResult::Continue)
    }

    fn parse_extended_timestamp(&mut self) -> Result<StepResult, ChunkDeserializationError> {
        if self.buffer.len() < 4 {
            return Ok(StepResult::NeedMoreBytes);
        }

        let mut cursor = Cursor::new(self.buffer.split_to(4));
        let extended = cursor.read_u32::<BigEndian>()?;

        let continuing_message = {
            let stream = current_stream(&mut self.streams, self.current_csid);
            !stream.assembly.is_empty()
        };

        // Continuation chunks of a message that started with an extended
        // timestamp repeat the 4 byte value; the repeat carries no new
        // information and must not shift the timestamp again
        if !(self.current_format == ChunkFormat::InheritedAll && continuing_message) {
            self.pending_timestamp_field = extended;
        }

        self.apply_timestamp();
        self.stage = DecodeStage::Payload;
        Ok(StepResult::Continue)
    }

    fn apply_timestamp(&mut self) {
        let field = self.pending_timestamp_field;
        let stream = current_stream(&mut self.streams, self.current_csid);
        let starts_new_message = stream.assembly.is_empty();

        match self.current_format {
            ChunkFormat::Full => {
                stream.header.timestamp.set(field);
                stream.header.timestamp_field = field;
            }

            ChunkFormat::InheritedStream | ChunkFormat::InheritedMessage => {
                stream.header.timestamp = stream.header.timestamp + field;
                stream.header.timestamp_field = field;
            }

            ChunkFormat::InheritedAll => {
                // Type 3 repeats the previous delta, but only when it opens a
                // new message.  Continuation chunks of a split message share
                // the message timestamp.
                if starts_new_message {
                    stream.header.timestamp = stream.header.timestamp + field;
                }
            }
        }
    }

    fn parse_payload(
        &mut self,
        message: &mut Option<MessagePayload>,
    ) -> Result<StepResult, ChunkDeserializationError> {
        let max_chunk_size = self.max_chunk_size;
        let stream = current_stream(&mut self.streams, self.current_csid);

        let total_length = stream.header.message_length as usize;
        let remaining = total_length.saturating_sub(stream.assembly.len());
        let chunk_payload_size = min(remaining, max_chunk_size);

        if self.buffer.len() < chunk_payload_size {
            return Ok(StepResult::NeedMoreBytes);
        }

        if stream.assembly.capacity() < total_length {
            stream.assembly.reserve(total_length - stream.assembly.len());
        }

        let bytes = self.buffer.split_to(chunk_payload_size);
        stream.assembly.extend_from_slice(&bytes);

        if stream.assembly.len() == total_length {
            let data = mem::replace(&mut stream.assembly, BytesMut::new());
            *message = Some(MessagePayload {
                timestamp: stream.header.timestamp,
                type_id: stream.header.message_type_id,
                message_stream_id: stream.header.message_stream_id,
                data: data.freeze(),
            });
        }

        self.stage = DecodeStage::BasicHeader;
        Ok(StepResult::Continue)
    }
}

/// The current chunk stream entry always exists once the basic header stage
/// accepted the csid.
fn current_stream(streams: &mut HashMap<u32, ChunkStream>, csid: u32) -> &mut ChunkStream {
    streams
        .entry(csid)
        .or_insert_with(|| ChunkStream::new(csid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::RtmpTimestamp;
    use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
    use std::io::{Cursor, Write};

    #[test]
    fn can_read_full_chunk_with_small_chunk_stream_id() {
        let bytes = form_type_0_chunk(50, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let mut deserializer = ChunkDeserializer::new();
        let result = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(result.type_id, 3, "Incorrect type id");
        assert_eq!(result.message_stream_id, 5, "Incorrect message stream id");
        assert_eq!(result.timestamp, RtmpTimestamp::new(25), "Incorrect timestamp");
        assert_eq!(&result.data[..], &[1, 2, 3], "Incorrect data");
    }

    #[test]
    fn can_read_full_chunk_with_two_byte_chunk_stream_id() {
        let bytes = form_type_0_chunk(200, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let mut deserializer = ChunkDeserializer::new();
        let result = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(result.type_id, 3, "Incorrect type id");
        assert_eq!(&result.data[..], &[1, 2, 3], "Incorrect data");
    }

    #[test]
    fn can_read_full_chunk_with_three_byte_chunk_stream_id() {
        let bytes = form_type_0_chunk(50000, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let mut deserializer = ChunkDeserializer::new();
        let result = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(result.type_id, 3, "Incorrect type id");
        assert_eq!(&result.data[..], &[1, 2, 3], "Incorrect data");
    }

    #[test]
    fn can_read_full_chunk_with_extended_timestamp() {
        let bytes = form_type_0_chunk(50, 16777216, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let mut deserializer = ChunkDeserializer::new();
        let result = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(
            result.timestamp,
            RtmpTimestamp::new(16777216),
            "Incorrect timestamp"
        );
        assert_eq!(&result.data[..], &[1, 2, 3], "Incorrect data");
    }

    #[test]
    fn type_1_chunk_inherits_message_stream_id_and_applies_delta() {
        let chunk_0 = form_type_0_chunk(50, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let chunk_1 = form_type_1_chunk(50, 10, 4, &[4, 5, 6]);

        let mut deserializer = ChunkDeserializer::new();
        let _ = deserializer.get_next_message(&chunk_0).unwrap().unwrap();
        let result = deserializer.get_next_message(&chunk_1).unwrap().unwrap();

        assert_eq!(result.type_id, 4, "Incorrect type id");
        assert_eq!(result.message_stream_id, 5, "Incorrect message stream id");
        assert_eq!(result.timestamp, RtmpTimestamp::new(35), "Incorrect timestamp");
        assert_eq!(&result.data[..], &[4, 5, 6], "Incorrect data");
    }

    #[test]
    fn type_2_chunk_inherits_length_and_type_and_applies_delta() {
        let chunk_0 = form_type_0_chunk(50, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let chunk_1 = form_type_1_chunk(50, 10, 4, &[4, 5, 6]);
        let chunk_2 = form_type_2_chunk(50, 11, &[7, 8, 9]);

        let mut deserializer = ChunkDeserializer::new();
        let _ = deserializer.get_next_message(&chunk_0).unwrap().unwrap();
        let _ = deserializer.get_next_message(&chunk_1).unwrap().unwrap();
        let result = deserializer.get_next_message(&chunk_2).unwrap().unwrap();

        assert_eq!(result.type_id, 4, "Incorrect type id");
        assert_eq!(
            result.timestamp,
            RtmpTimestamp::new(25 + 10 + 11),
            "Incorrect timestamp"
        );
        assert_eq!(&result.data[..], &[7, 8, 9], "Incorrect data");
    }

    #[test]
    fn type_3_chunk_repeats_previous_delta_for_new_message() {
        let chunk_0 = form_type_0_chunk(50, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let chunk_1 = form_type_1_chunk(50, 10, 4, &[4, 5, 6]);
        let chunk_2 = form_type_2_chunk(50, 11, &[7, 8, 9]);
        let chunk_3 = form_type_3_chunk(50, &[10, 11, 12], INITIAL_MAX_CHUNK_SIZE, None);

        let mut deserializer = ChunkDeserializer::new();
        let _ = deserializer.get_next_message(&chunk_0).unwrap().unwrap();
        let _ = deserializer.get_next_message(&chunk_1).unwrap().unwrap();
        let _ = deserializer.get_next_message(&chunk_2).unwrap().unwrap();
        let result = deserializer.get_next_message(&chunk_3).unwrap().unwrap();

        assert_eq!(result.type_id, 4, "Incorrect type id");
        assert_eq!(
            result.timestamp,
            RtmpTimestamp::new(25 + 10 + 11 + 11),
            "Incorrect timestamp"
        );
        assert_eq!(&result.data[..], &[10, 11, 12], "Incorrect data");
    }

    #[test]
    fn delta_encoded_chunk_without_prior_full_chunk_is_an_error() {
        let chunk_1 = form_type_1_chunk(50, 10, 4, &[4, 5, 6]);
        let mut deserializer = ChunkDeserializer::new();

        match deserializer.get_next_message(&chunk_1) {
            Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid: 50 }) => {}
            x => panic!("Expected NoPreviousChunkOnStream, got {:?}", x),
        }
    }

    #[test]
    fn can_read_message_spread_across_multiple_calls() {
        let all_bytes = form_type_0_chunk(50, 25, 5, 3, &[1, 2, 3], INITIAL_MAX_CHUNK_SIZE);
        let (first, second) = all_bytes.split_at(all_bytes.len() / 2);

        let mut deserializer = ChunkDeserializer::new();
        let no_message = deserializer.get_next_message(first).unwrap();
        assert!(no_message.is_none(), "Expected no message from partial bytes");

        let result = deserializer.get_next_message(second).unwrap().unwrap();
        assert_eq!(&result.data[..], &[1, 2, 3], "Incorrect data");
    }

    #[test]
    fn can_reassemble_message_exceeding_maximum_chunk_size() {
        let payload = [100_u8; 500];
        let bytes = form_type_0_chunk(50, 25, 5, 3, &payload, 100);

        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_chunk_size(100).unwrap();
        let result = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(result.timestamp, RtmpTimestamp::new(25), "Incorrect timestamp");
        assert_eq!(&result.data[..], &payload[..], "Incorrect data");
    }

    #[test]
    fn interleaved_chunk_streams_reassemble_independently() {
        let payload_a = [0xaa_u8; 200];
        let payload_b = [0xbb_u8; 200];
        let chunks_a = form_type_0_chunk(3, 10, 1, 8, &payload_a, 100);
        let chunks_b = form_type_0_chunk(4, 20, 1, 9, &payload_b, 100);

        // First wire chunk of each message, then the continuations
        let (a_first, a_rest) = chunks_a.split_at(12 + 100);
        let (b_first, b_rest) = chunks_b.split_at(12 + 100);

        let mut interleaved = Vec::new();
        interleaved.extend_from_slice(a_first);
        interleaved.extend_from_slice(b_first);
        interleaved.extend_from_slice(a_rest);
        interleaved.extend_from_slice(b_rest);

        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_chunk_size(100).unwrap();

        let first = deserializer.get_next_message(&interleaved).unwrap().unwrap();
        let second = deserializer.get_next_message(&[]).unwrap().unwrap();

        assert_eq!(first.type_id, 8, "Incorrect first message type");
        assert_eq!(&first.data[..], &payload_a[..], "Incorrect first payload");
        assert_eq!(second.type_id, 9, "Incorrect second message type");
        assert_eq!(&second.data[..], &payload_b[..], "Incorrect second payload");
    }

    #[test]
    fn abort_discards_partial_reassembly_but_keeps_header_state() {
        let payload = [100_u8; 200];
        let bytes = form_type_0_chunk(50, 25, 5, 3, &payload, 100);

        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_chunk_size(100).unwrap();

        // Feed only the first wire chunk then abort the message
        let no_message = deserializer.get_next_message(&bytes[..12 + 100]).unwrap();
        assert!(no_message.is_none(), "Message unexpectedly completed");
        deserializer.abort(50);

        // A delta encoded chunk on the same csid still resolves afterwards
        let next_chunk = form_type_1_chunk(50, 10, 3, &[1, 2, 3]);
        let result = deserializer.get_next_message(&next_chunk).unwrap().unwrap();
        assert_eq!(result.timestamp, RtmpTimestamp::new(35), "Incorrect timestamp");
        assert_eq!(&result.data[..], &[1, 2, 3], "Incorrect data");
    }

    #[test]
    fn continuation_chunks_do_not_reapply_timestamp_delta() {
        // A type 1 chunk split across two wire chunks; the type 3 continuation
        // must not shift the timestamp a second time
        let chunk1 = [
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x09, 0x01, 0x00, 0x00, 0x00, 0x01,
        ];
        let chunk2 = [
            0x44, 0x00, 0x00, 0x21, 0x00, 0x00, 0x05, 0x09, 0x01, 0x02, 0x03, 0x04, 0xc4, 0x05,
        ];

        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_chunk_size(4).unwrap();

        let payload1 = deserializer.get_next_message(&chunk1).unwrap().unwrap();
        assert_eq!(payload1.timestamp, RtmpTimestamp::new(0), "Incorrect payload 1 timestamp");
        assert_eq!(&payload1.data[..], &[0x01], "Incorrect payload 1 data");

        let payload2 = deserializer.get_next_message(&chunk2).unwrap().unwrap();
        assert_eq!(payload2.timestamp, RtmpTimestamp::new(33), "Incorrect payload 2 timestamp");
        assert_eq!(
            &payload2.data[..],
            &[0x01, 0x02, 0x03, 0x04, 0x05],
            "Incorrect payload 2 data"
        );
    }

    #[test]
    fn continuation_chunks_repeat_extended_timestamp() {
        let chunk1 = [
            0x06, 0xff, 0xff, 0xff, 0x00, 0x00, 0x07, 0x09, 0x01, 0x00, 0x00, 0x00, 0x01, 0xff,
            0xff, 0xff, 0x01, 0x02, 0x03, 0x04,
        ];
        let chunk2 = [0xc6, 0x01, 0xff, 0xff, 0xff, 0x05, 0x06, 0x07];

        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_chunk_size(4).unwrap();
        let _ = deserializer.get_next_message(&chunk1).unwrap();
        let payload = deserializer.get_next_message(&chunk2).unwrap().unwrap();

        assert_eq!(
            payload.timestamp,
            RtmpTimestamp::new(0x1ffffff),
            "Incorrect timestamp"
        );
        assert_eq!(
            &payload.data[..],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07],
            "Incorrect data"
        );
    }

    #[test]
    fn error_when_setting_chunk_size_too_large() {
        let mut deserializer = ChunkDeserializer::new();
        match deserializer.set_max_chunk_size(2147483648) {
            Err(ChunkDeserializationError::InvalidMaxChunkSize { chunk_size }) => {
                assert_eq!(chunk_size, 2147483648)
            }
            x => panic!("Expected InvalidMaxChunkSize, got {:?}", x),
        }
    }

    fn write_basic_header(cursor: &mut Cursor<Vec<u8>>, format_bits: u8, csid: u32) {
        if csid < 64 {
            cursor.write_u8(csid as u8 | format_bits).unwrap();
        } else if csid < 320 {
            cursor.write_u8(format_bits).unwrap();
            cursor.write_u8((csid - 64) as u8).unwrap();
        } else {
            cursor.write_u8(1 | format_bits).unwrap();
            cursor.write_u16::<LittleEndian>((csid - 64) as u16).unwrap();
        }
    }

    fn form_type_0_chunk(
        csid: u32,
        timestamp: u32,
        message_stream_id: u32,
        type_id: u8,
        payload: &[u8],
        max_chunk_size: usize,
    ) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_basic_header(&mut cursor, 0b00000000, csid);

        let field = min(timestamp, 0xffffff);
        cursor.write_u24::<BigEndian>(field).unwrap();
        cursor.write_u24::<BigEndian>(payload.len() as u32).unwrap();
        cursor.write_u8(type_id).unwrap();
        cursor.write_u32::<LittleEndian>(message_stream_id).unwrap();

        let extended_timestamp = if timestamp >= 0xffffff {
            cursor.write_u32::<BigEndian>(timestamp).unwrap();
            Some(timestamp)
        } else {
            None
        };

        if payload.len() > max_chunk_size {
            cursor.write_all(&payload[..max_chunk_size]).unwrap();
            let continuation = form_type_3_chunk(
                csid,
                &payload[max_chunk_size..],
                max_chunk_size,
                extended_timestamp,
            );
            cursor.write_all(&continuation).unwrap();
        } else {
            cursor.write_all(payload).unwrap();
        }

        cursor.into_inner()
    }

    fn form_type_1_chunk(csid: u32, delta: u32, type_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_basic_header(&mut cursor, 0b01000000, csid);
        cursor.write_u24::<BigEndian>(delta).unwrap();
        cursor.write_u24::<BigEndian>(payload.len() as u32).unwrap();
        cursor.write_u8(type_id).unwrap();
        cursor.write_all(payload).unwrap();
        cursor.into_inner()
    }

    fn form_type_2_chunk(csid: u32, delta: u32, payload: &[u8]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_basic_header(&mut cursor, 0b10000000, csid);
        cursor.write_u24::<BigEndian>(delta).unwrap();
        cursor.write_all(payload).unwrap();
        cursor.into_inner()
    }

    fn form_type_3_chunk(
        csid: u32,
        payload: &[u8],
        max_chunk_size: usize,
        extended_timestamp: Option<u32>,
    ) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_basic_header(&mut cursor, 0b11000000, csid);

        if let Some(timestamp) = extended_timestamp {
            cursor.write_u32::<BigEndian>(timestamp).unwrap();
        }

        if payload.len() > max_chunk_size {
            cursor.write_all(&payload[..max_chunk_size]).unwrap();
            let continuation = form_type_3_chunk(
                csid,
                &payload[max_chunk_size..],
                max_chunk_size,
                extended_timestamp,
            );
            cursor.write_all(&continuation).unwrap();
        } else {
            cursor.write_all(payload).unwrap();
        }

        cursor.into_inner()
    }
}
