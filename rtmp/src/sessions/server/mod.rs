mod config;
mod errors;
mod events;
mod result;
mod session_state;


use std::time::SystemTime;

use crate::chunk_io::{ChunkDeserializer, ChunkSerializer, Packet};
use crate::messages::{
    MessagePayload, PeerBandwidthLimitType, RtmpMessage, UserControlEventType,
};
use crate::time::RtmpTimestamp;
use bytes::Bytes;
use mms_amf0::Amf0Value;

use self::session_state::SessionState;

pub use self::config::ServerSessionConfig;
pub use self::errors::ServerSessionError;
pub use self::events::ServerSessionEvent;
pub use self::result::ServerSessionResult;

/// Outbound chunk stream ids, chosen the way the reference servers spread
/// their traffic: control messages on 2, command replies on 3, status replies
/// and video on 4, audio on 5.
const CONTROL_CHUNK_STREAM: u32 = 2;
const COMMAND_CHUNK_STREAM: u32 = 3;
const STATUS_CHUNK_STREAM: u32 = 4;
const VIDEO_CHUNK_STREAM: u32 = 4;
const AUDIO_CHUNK_STREAM: u32 = 5;

/// The one message stream id this server hands out from `createStream`.
const ASSIGNED_STREAM_ID: u32 = 1;

/// A session representing the server side of a single RTMP connection, fed
/// with every byte that arrives after the handshake completes.
///
/// The session decodes chunk framed messages, runs the flow control rules
/// (acknowledgement windows, chunk size and bandwidth negotiation) and drives
/// the command workflow from `connect` through `play`, producing packets to be
/// sent back in order plus events for the application.
///
/// State lives per session; two connections never share chunk stream or
/// window bookkeeping.
pub struct ServerSession {
    start_time: SystemTime,
    config: ServerSessionConfig,
    serializer: ChunkSerializer,
    deserializer: ChunkDeserializer,
    current_state: SessionState,
    connected_app_name: Option<String>,
    playing_stream_name: Option<String>,
    ready_for_media: bool,
    parsing_disabled: bool,

    /// Total bytes fed into the session, mirrored in outbound acknowledgements
    bytes_received: u32,

    /// Value of `bytes_received` when the last acknowledgement was sent
    last_acknowledged: u32,

    /// How many bytes we may receive before acknowledging, set by the peer
    ack_window_size: u32,

    /// Outbound window granted by the peer's `SetPeerBandwidth`
    peer_window_size: u32,

    /// The peer's last acknowledged byte count
    peer_acknowledged: u32,
}

impl ServerSession {
    pub fn new(config: ServerSessionConfig) -> ServerSession {
        let ack_window_size = config.window_ack_size;

        ServerSession {
            start_time: SystemTime::now(),
            config,
            serializer: ChunkSerializer::new(),
            deserializer: ChunkDeserializer::new(),
            current_state: SessionState::Idle,
            connected_app_name: None,
            playing_stream_name: None,
            ready_for_media: false,
            parsing_disabled: false,
            bytes_received: 0,
            last_acknowledged: 0,
            ack_window_size,
            peer_window_size: 0,
            peer_acknowledged: 0,
        }
    }

    /// Takes bytes arriving from the peer and returns the packets and events
    /// they cause.  Packets must be sent to the peer in order.
    pub fn handle_input(
        &mut self,
        bytes: &[u8],
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        if self.parsing_disabled {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        self.bytes_received = self.bytes_received.wrapping_add(bytes.len() as u32);

        // Once a full window has gone unacknowledged the acknowledgement goes
        // out before any further payload is processed
        if self.ack_window_size > 0
            && self.bytes_received.wrapping_sub(self.last_acknowledged) >= self.ack_window_size
        {
            self.last_acknowledged = self.bytes_received;
            let message = RtmpMessage::Acknowledgement {
                sequence_number: self.bytes_received,
            };

            let packet = self.send_control_message(message)?;
            results.push(ServerSessionResult::OutboundResponse(packet));
        }

        let mut bytes_to_process = bytes;
        loop {
            if self.parsing_disabled {
                break;
            }

            let payload = match self.deserializer.get_next_message(bytes_to_process)? {
                Some(payload) => payload,
                None => break,
            };

            bytes_to_process = &[];

            let message = match payload.to_rtmp_message() {
                Ok(message) => message,
                Err(error) => {
                    // Message level decode problems are recoverable, skip the
                    // message and keep the connection alive
                    log::warn!(
                        "Failed to decode message with type id {}: {}",
                        payload.type_id,
                        error
                    );
                    continue;
                }
            };

            let mut message_results = self.handle_message(message, &payload)?;
            results.append(&mut message_results);
        }

        Ok(results)
    }

    /// Whether a `play` command has armed the session for outbound media.
    pub fn is_ready_for_media(&self) -> bool {
        self.ready_for_media
    }

    /// The application name the client connected with.
    pub fn connected_app_name(&self) -> Option<&str> {
        self.connected_app_name.as_deref()
    }

    /// The sanitized stream name playback was requested for.
    pub fn playing_stream_name(&self) -> Option<&str> {
        self.playing_stream_name.as_deref()
    }

    /// The outbound window granted by the peer's `SetPeerBandwidth`.  Callers
    /// throttling media should pause once this many unacknowledged bytes are
    /// in flight.
    pub fn peer_window_size(&self) -> u32 {
        self.peer_window_size
    }

    /// The peer's last acknowledged received byte count.
    pub fn peer_acknowledged_bytes(&self) -> u32 {
        self.peer_acknowledged
    }

    /// Frames an audio payload for the playing stream.
    pub fn send_audio_data(
        &mut self,
        data: Bytes,
        timestamp: RtmpTimestamp,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::AudioData { data };
        let payload = message.into_message_payload(timestamp, ASSIGNED_STREAM_ID)?;
        let packet = self.serializer.serialize(&payload, AUDIO_CHUNK_STREAM, false)?;
        Ok(packet)
    }

    /// Frames a video payload for the playing stream.
    pub fn send_video_data(
        &mut self,
        data: Bytes,
        timestamp: RtmpTimestamp,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::VideoData { data };
        let payload = message.into_message_payload(timestamp, ASSIGNED_STREAM_ID)?;
        let packet = self.serializer.serialize(&payload, VIDEO_CHUNK_STREAM, false)?;
        Ok(packet)
    }

    fn handle_message(
        &mut self,
        message: RtmpMessage,
        payload: &MessagePayload,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        match message {
            RtmpMessage::SetChunkSize { size } => {
                self.deserializer.set_max_chunk_size(size as usize)?;
                Ok(vec![ServerSessionResult::RaisedEvent(
                    ServerSessionEvent::ClientChunkSizeChanged { new_chunk_size: size },
                )])
            }

            RtmpMessage::Abort { stream_id } => {
                self.deserializer.abort(stream_id);
                Ok(Vec::new())
            }

            RtmpMessage::Acknowledgement { sequence_number } => {
                self.peer_acknowledged = sequence_number;
                Ok(vec![ServerSessionResult::RaisedEvent(
                    ServerSessionEvent::AcknowledgementReceived {
                        bytes_received: sequence_number,
                    },
                )])
            }

            RtmpMessage::WindowAcknowledgement { size } => {
                // Adopt the peer's window and confirm our received counter
                // right away
                self.ack_window_size = size;
                self.last_acknowledged = self.bytes_received;

                let reply = RtmpMessage::Acknowledgement {
                    sequence_number: self.bytes_received,
                };
                let packet = self.send_control_message(reply)?;
                Ok(vec![ServerSessionResult::OutboundResponse(packet)])
            }

            RtmpMessage::SetPeerBandwidth { size, .. } => {
                self.peer_window_size = size;

                let reply = RtmpMessage::WindowAcknowledgement { size };
                let packet = self.send_control_message(reply)?;
                Ok(vec![ServerSessionResult::OutboundResponse(packet)])
            }

            RtmpMessage::UserControl {
                event_type,
                timestamp,
                ..
            } => self.handle_user_control(event_type, timestamp),

            RtmpMessage::AudioData { data } => Ok(vec![ServerSessionResult::RaisedEvent(
                ServerSessionEvent::AudioDataReceived {
                    data,
                    timestamp: payload.timestamp,
                },
            )]),

            RtmpMessage::VideoData { data } => Ok(vec![ServerSessionResult::RaisedEvent(
                ServerSessionEvent::VideoDataReceived {
                    data,
                    timestamp: payload.timestamp,
                },
            )]),

            RtmpMessage::Amf0Data { values } => Ok(vec![ServerSessionResult::RaisedEvent(
                ServerSessionEvent::Amf0DataReceived { values },
            )]),

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => self.handle_amf0_command(
                payload.message_stream_id,
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            ),

            RtmpMessage::Unknown { type_id, .. } => self.handle_unknown_message(type_id, payload),
        }
    }

    fn handle_user_control(
        &mut self,
        event_type: UserControlEventType,
        timestamp: Option<RtmpTimestamp>,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        match event_type {
            UserControlEventType::PingRequest => {
                // Echo the ping timestamp straight back
                let reply = RtmpMessage::UserControl {
                    event_type: UserControlEventType::PingResponse,
                    stream_id: None,
                    buffer_length: None,
                    timestamp,
                };

                let packet = self.send_control_message(reply)?;
                Ok(vec![ServerSessionResult::OutboundResponse(packet)])
            }

            UserControlEventType::PingResponse => Ok(vec![ServerSessionResult::RaisedEvent(
                ServerSessionEvent::PingResponseReceived {
                    timestamp: timestamp.unwrap_or_else(|| RtmpTimestamp::new(0)),
                },
            )]),

            other => {
                log::debug!("Ignoring user control event {:?}", other);
                Ok(Vec::new())
            }
        }
    }

    fn handle_unknown_message(
        &mut self,
        type_id: u8,
        payload: &MessagePayload,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        match type_id {
            // AMF3 messages, AMF0 shared objects and aggregates are known
            // traffic this engine leaves to others
            15 | 16 | 17 | 19 | 22 => {
                log::debug!("Passing through message with type id {}", type_id);
                Ok(vec![ServerSessionResult::UnhandleableMessageReceived(
                    payload.clone(),
                )])
            }

            _ => {
                // An id outside every known range usually means the chunk
                // stream is corrupted, stop interpreting further input
                log::warn!(
                    "Received message with unknown type id {}, no further input will be parsed",
                    type_id
                );
                self.parsing_disabled = true;
                Ok(Vec::new())
            }
        }
    }

    fn handle_amf0_command(
        &mut self,
        stream_id: u32,
        name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_args: Vec<Amf0Value>,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        match name.as_str() {
            "connect" => self.handle_command_connect(stream_id, transaction_id, command_object),
            "createStream" => self.handle_command_create_stream(stream_id, transaction_id),
            "getStreamLength" | "getMovLen" => {
                self.handle_command_stream_length(stream_id, transaction_id)
            }
            "checkBandwidth" => self.handle_command_check_bandwidth(stream_id, transaction_id),
            "play" | "play2" => {
                self.handle_command_play(stream_id, transaction_id, additional_args)
            }

            _ => {
                // Deliberate leniency: unrecognized commands get no error
                // reply at all
                log::warn!("Ignoring unhandled amf0 command '{}'", name);
                Ok(vec![ServerSessionResult::RaisedEvent(
                    ServerSessionEvent::UnhandleableAmf0Command {
                        command_name: name,
                        transaction_id,
                        command_object,
                        additional_values: additional_args,
                    },
                )])
            }
        }
    }

    fn handle_command_connect(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        command_object: Amf0Value,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        if self.current_state != SessionState::Idle {
            log::debug!("Connect command received on an already connected session");
        }

        let app_name = match &command_object {
            Amf0Value::Object(_) => command_object
                .get_property("app")
                .cloned()
                .and_then(Amf0Value::get_string)
                .map(|mut app| {
                    if app.ends_with('/') {
                        app.pop();
                    }
                    app
                })
                .unwrap_or_default(),

            _ => return Err(ServerSessionError::NoConnectCommandObject),
        };

        self.connected_app_name = Some(app_name.clone());

        let mut results = Vec::with_capacity(5);

        let window_ack = RtmpMessage::WindowAcknowledgement {
            size: self.config.window_ack_size,
        };
        let packet = self.send_control_message(window_ack)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        let peer_bandwidth = RtmpMessage::SetPeerBandwidth {
            size: self.config.peer_bandwidth,
            limit_type: PeerBandwidthLimitType::Hard,
        };
        let packet = self.send_control_message(peer_bandwidth)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        let stream_begin = RtmpMessage::UserControl {
            event_type: UserControlEventType::StreamBegin,
            stream_id: Some(ASSIGNED_STREAM_ID),
            buffer_length: None,
            timestamp: None,
        };
        let packet = self.send_control_message(stream_begin)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        let server_properties = Amf0Value::Object(vec![
            (
                "fmsVer".to_string(),
                Amf0Value::Utf8String(self.config.fms_version.clone()),
            ),
            ("capabilities".to_string(), Amf0Value::Number(31.0)),
        ]);

        let status_info = Amf0Value::Object(vec![
            (
                "level".to_string(),
                Amf0Value::Utf8String("status".to_string()),
            ),
            (
                "code".to_string(),
                Amf0Value::Utf8String("NetConnection.Connect.Success".to_string()),
            ),
            (
                "description".to_string(),
                Amf0Value::Utf8String("Connection succeeded.".to_string()),
            ),
        ]);

        let packet = self.send_success_response(
            stream_id,
            transaction_id,
            server_properties,
            vec![status_info],
        )?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::ConnectionRequested { app_name },
        ));

        self.current_state = SessionState::Connected;
        Ok(results)
    }

    fn handle_command_create_stream(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        let packet = self.send_success_response(
            stream_id,
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Number(ASSIGNED_STREAM_ID as f64)],
        )?;

        self.current_state = SessionState::StreamCreated;
        Ok(vec![ServerSessionResult::OutboundResponse(packet)])
    }

    fn handle_command_stream_length(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        // Durations live in the container layer, report zero
        let packet = self.send_success_response(
            stream_id,
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Number(0.0)],
        )?;

        Ok(vec![ServerSessionResult::OutboundResponse(packet)])
    }

    fn handle_command_check_bandwidth(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        let packet = self.send_success_response(
            stream_id,
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Null],
        )?;

        Ok(vec![ServerSessionResult::OutboundResponse(packet)])
    }

    fn handle_command_play(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        mut additional_args: Vec<Amf0Value>,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        let requested_name = if additional_args.is_empty() {
            String::new()
        } else {
            additional_args.remove(0).get_string().unwrap_or_default()
        };

        // Stream names are restricted to lowercase alphanumerics; anything
        // else is stripped, not escaped
        let stream_name: String = requested_name
            .chars()
            .filter(|character| character.is_ascii_alphanumeric())
            .map(|character| character.to_ascii_lowercase())
            .collect();

        let mut results = Vec::with_capacity(6);

        let stream_begin = RtmpMessage::UserControl {
            event_type: UserControlEventType::StreamBegin,
            stream_id: Some(ASSIGNED_STREAM_ID),
            buffer_length: None,
            timestamp: None,
        };
        let packet = self.send_control_message(stream_begin)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        let reset_status = self.play_status_object(
            "NetStream.Play.Reset",
            "Playing and resetting.",
            &stream_name,
        );
        let packet = self.send_status_response(stream_id, transaction_id, reset_status)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        let start_status =
            self.play_status_object("NetStream.Play.Start", "Started playing.", &stream_name);
        let packet =
            self.send_status_response(ASSIGNED_STREAM_ID, transaction_id, start_status)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        // Interactive playback wants far larger chunks than the 128 byte
        // protocol default
        let epoch = self.get_epoch();
        let packet = self
            .serializer
            .set_max_chunk_size(self.config.playback_chunk_size, epoch)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        self.ready_for_media = true;
        self.playing_stream_name = Some(stream_name.clone());
        self.current_state = SessionState::Playing;

        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::PlaybackRequested {
                stream_name,
                stream_id: ASSIGNED_STREAM_ID,
            },
        ));

        Ok(results)
    }

    fn play_status_object(&self, code: &str, description: &str, details: &str) -> Amf0Value {
        Amf0Value::Object(vec![
            (
                "level".to_string(),
                Amf0Value::Utf8String("status".to_string()),
            ),
            ("code".to_string(), Amf0Value::Utf8String(code.to_string())),
            (
                "description".to_string(),
                Amf0Value::Utf8String(description.to_string()),
            ),
            (
                "details".to_string(),
                Amf0Value::Utf8String(details.to_string()),
            ),
            ("clientid".to_string(), Amf0Value::Number(1.0)),
        ])
    }

    fn send_control_message(
        &mut self,
        message: RtmpMessage,
    ) -> Result<Packet, ServerSessionError> {
        let payload = message.into_message_payload(self.get_epoch(), 0)?;
        let packet = self
            .serializer
            .serialize(&payload, CONTROL_CHUNK_STREAM, false)?;
        Ok(packet)
    }

    fn send_success_response(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::Amf0Command {
            command_name: "_result".to_string(),
            transaction_id,
            command_object,
            additional_arguments,
        };

        let payload = message.into_message_payload(self.get_epoch(), stream_id)?;
        let packet = self
            .serializer
            .serialize(&payload, COMMAND_CHUNK_STREAM, false)?;
        Ok(packet)
    }

    fn send_status_response(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        status_object: Amf0Value,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::Amf0Command {
            command_name: "onStatus".to_string(),
            transaction_id,
            command_object: Amf0Value::Null,
            additional_arguments: vec![status_object],
        };

        let payload = message.into_message_payload(self.get_epoch(), stream_id)?;
        let packet = self
            .serializer
            .serialize(&payload, STATUS_CHUNK_STREAM, false)?;
        Ok(packet)
    }

    fn get_epoch(&self) -> RtmpTimestamp {
        match self.start_time.elapsed() {
            Ok(elapsed) => RtmpTimestamp::new(elapsed.as_millis() as u32),
            Err(_) => RtmpTimestamp::new(0),
        }
    }
}
