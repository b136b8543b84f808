use crate::time::RtmpTimestamp;
use bytes::Bytes;
use mms_amf0::Amf0Value;

/// An event a server session raises for the surrounding application.
#[derive(Debug, PartialEq, Clone)]
pub enum ServerSessionEvent {
    /// A client asked to connect to the given application name
    ConnectionRequested { app_name: String },

    /// The client changed the maximum size of the chunks it will send
    ClientChunkSizeChanged { new_chunk_size: u32 },

    /// The client acknowledged receipt of the given number of bytes
    AcknowledgementReceived { bytes_received: u32 },

    /// The client answered a ping request
    PingResponseReceived { timestamp: RtmpTimestamp },

    /// The client requested playback; media for the (sanitized) stream name
    /// should start flowing on the given message stream id
    PlaybackRequested { stream_name: String, stream_id: u32 },

    /// An audio payload arrived, to be handed to the container layer verbatim
    AudioDataReceived { data: Bytes, timestamp: RtmpTimestamp },

    /// A video payload arrived, to be handed to the container layer verbatim
    VideoDataReceived { data: Bytes, timestamp: RtmpTimestamp },

    /// An AMF0 data message (such as `onMetaData`) arrived
    Amf0DataReceived { values: Vec<Amf0Value> },

    /// The client sent a command this session does not act on.  No error
    /// reply is sent; ignoring unknown commands is deliberate.
    UnhandleableAmf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },
}
