/*!
The RTMP message types and the functionality to convert them to and from raw
message payloads.

A [`MessagePayload`] is what the chunk layer produces and consumes: a type id,
a message stream id, a timestamp and opaque bytes.  An [`RtmpMessage`] is the
decoded meaning of those bytes.  Audio and video payloads are deliberately not
interpreted; they pass through as bytes for the container layer to deal with.
*/

mod deserialization_errors;
mod message_payload;
mod serialization_errors;
mod types;

pub use self::deserialization_errors::MessageDeserializationError;
pub use self::message_payload::MessagePayload;
pub use self::serialization_errors::MessageSerializationError;

use crate::time::RtmpTimestamp;
use bytes::Bytes;
use mms_amf0::Amf0Value;

/// How strictly the peer should honor a `SetPeerBandwidth` request.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PeerBandwidthLimitType {
    /// Limit output bandwidth to the indicated window size
    Hard,

    /// Limit output bandwidth to this window or the one already in effect,
    /// whichever is smaller
    Soft,

    /// Treat as hard if the previous limit was hard, otherwise ignore
    Dynamic,
}

/// The event notifications carried by user control (type 4) messages.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum UserControlEventType {
    /// The stream with the given id has become functional
    StreamBegin,

    /// Playback of data on the stream is over
    StreamEof,

    /// There is temporarily no more data on the stream
    StreamDry,

    /// The client reports the buffer size (in milliseconds) it is using
    SetBufferLength,

    /// The stream is a recorded stream
    StreamIsRecorded,

    /// Sent to test whether the peer is reachable
    PingRequest,

    /// Answers a ping request, echoing its timestamp
    PingResponse,
}

/// Every RTMP message type the engine understands.
#[derive(PartialEq, Debug, Clone)]
pub enum RtmpMessage {
    /// Carries any message type id outside the understood set, data untouched
    Unknown { type_id: u8, data: Bytes },

    /// Changes the maximum chunk size for chunks the sender emits after it
    SetChunkSize { size: u32 },

    /// Tells the receiver to throw away a partially received message on the
    /// given chunk stream id
    Abort { stream_id: u32 },

    /// Confirms the number of bytes received since the previous
    /// acknowledgement
    Acknowledgement { sequence_number: u32 },

    /// Notifies the peer of a stream lifecycle event
    UserControl {
        event_type: UserControlEventType,
        stream_id: Option<u32>,
        buffer_length: Option<u32>,
        timestamp: Option<RtmpTimestamp>,
    },

    /// Declares how many bytes may be received before an `Acknowledgement`
    /// must be sent back
    WindowAcknowledgement { size: u32 },

    /// Asks the peer to limit its output bandwidth
    SetPeerBandwidth {
        size: u32,
        limit_type: PeerBandwidthLimitType,
    },

    /// Opaque audio payload
    AudioData { data: Bytes },

    /// Opaque video payload
    VideoData { data: Bytes },

    /// A sequence of AMF0 values carrying stream metadata or similar
    Amf0Data { values: Vec<Amf0Value> },

    /// An AMF0 encoded command such as `connect`, `createStream` or `play`
    Amf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
    },
}

impl RtmpMessage {
    pub fn into_message_payload(
        self,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        MessagePayload::from_rtmp_message(self, timestamp, message_stream_id)
    }

    pub fn get_message_type_id(&self) -> u8 {
        match *self {
            RtmpMessage::Unknown { type_id, .. } => type_id,
            RtmpMessage::SetChunkSize { .. } => 1,
            RtmpMessage::Abort { .. } => 2,
            RtmpMessage::Acknowledgement { .. } => 3,
            RtmpMessage::UserControl { .. } => 4,
            RtmpMessage::WindowAcknowledgement { .. } => 5,
            RtmpMessage::SetPeerBandwidth { .. } => 6,
            RtmpMessage::AudioData { .. } => 8,
            RtmpMessage::VideoData { .. } => 9,
            RtmpMessage::Amf0Data { .. } => 18,
            RtmpMessage::Amf0Command { .. } => 20,
        }
    }
}
