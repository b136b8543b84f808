use super::types;
use super::RtmpMessage;
use super::{MessageDeserializationError, MessageSerializationError};
use crate::time::RtmpTimestamp;
use bytes::Bytes;

/// A raw RTMP message: the undecoded payload bytes plus the framing metadata
/// the chunk layer needs (or produced).
#[derive(PartialEq, Debug, Clone)]
pub struct MessagePayload {
    pub timestamp: RtmpTimestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    pub fn new() -> MessagePayload {
        MessagePayload {
            timestamp: RtmpTimestamp::new(0),
            type_id: 0,
            message_stream_id: 0,
            data: Bytes::new(),
        }
    }

    /// Decodes the payload bytes according to the message's type id.
    ///
    /// Type ids outside the understood set are not an error at this layer;
    /// they come back as `RtmpMessage::Unknown` for the session to judge.
    pub fn to_rtmp_message(&self) -> Result<RtmpMessage, MessageDeserializationError> {
        match self.type_id {
            1 => types::set_chunk_size::deserialize(self.data.clone()),
            2 => types::abort::deserialize(self.data.clone()),
            3 => types::acknowledgement::deserialize(self.data.clone()),
            4 => types::user_control::deserialize(self.data.clone()),
            5 => types::window_acknowledgement_size::deserialize(self.data.clone()),
            6 => types::set_peer_bandwidth::deserialize(self.data.clone()),
            8 => types::audio_data::deserialize(self.data.clone()),
            9 => types::video_data::deserialize(self.data.clone()),
            18 => types::amf0_data::deserialize(self.data.clone()),
            20 => types::amf0_command::deserialize(self.data.clone()),
            _ => Ok(RtmpMessage::Unknown {
                type_id: self.type_id,
                data: self.data.clone(),
            }),
        }
    }

    /// Encodes a message into payload bytes tagged with the given timestamp
    /// and message stream id.
    pub fn from_rtmp_message(
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        let type_id = message.get_message_type_id();

        let data = match message {
            RtmpMessage::Unknown { data, .. } => data,

            RtmpMessage::SetChunkSize { size } => types::set_chunk_size::serialize(size)?,

            RtmpMessage::Abort { stream_id } => types::abort::serialize(stream_id)?,

            RtmpMessage::Acknowledgement { sequence_number } => {
                types::acknowledgement::serialize(sequence_number)?
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                buffer_length,
                timestamp,
            } => types::user_control::serialize(event_type, stream_id, buffer_length, timestamp)?,

            RtmpMessage::WindowAcknowledgement { size } => {
                types::window_acknowledgement_size::serialize(size)?
            }

            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                types::set_peer_bandwidth::serialize(limit_type, size)?
            }

            RtmpMessage::AudioData { data } => types::audio_data::serialize(data)?,

            RtmpMessage::VideoData { data } => types::video_data::serialize(data)?,

            RtmpMessage::Amf0Data { values } => types::amf0_data::serialize(values)?,

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => types::amf0_command::serialize(
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            )?,
        };

        Ok(MessagePayload {
            timestamp,
            type_id,
            message_stream_id,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{PeerBandwidthLimitType, RtmpMessage, UserControlEventType};
    use super::MessagePayload;
    use crate::time::RtmpTimestamp;
    use bytes::Bytes;
    use mms_amf0::Amf0Value;

    fn round_trip(message: RtmpMessage) {
        let payload =
            MessagePayload::from_rtmp_message(message.clone(), RtmpTimestamp::new(0), 15).unwrap();
        let result = payload.to_rtmp_message().unwrap();

        assert_eq!(result, message);
    }

    #[test]
    fn payload_metadata_matches_inputs() {
        let message = RtmpMessage::Acknowledgement {
            sequence_number: 23,
        };
        let result =
            MessagePayload::from_rtmp_message(message, RtmpTimestamp::new(55), 52).unwrap();

        assert_ne!(result.data.len(), 0, "Empty payload data seen");
        assert_eq!(result.type_id, 3, "Incorrect type id");
        assert_eq!(result.message_stream_id, 52, "Incorrect message stream id");
        assert_eq!(result.timestamp, 55, "Incorrect timestamp");
    }

    #[test]
    fn set_chunk_size_round_trips() {
        round_trip(RtmpMessage::SetChunkSize { size: 4096 });
    }

    #[test]
    fn abort_round_trips() {
        round_trip(RtmpMessage::Abort { stream_id: 15 });
    }

    #[test]
    fn acknowledgement_round_trips() {
        round_trip(RtmpMessage::Acknowledgement {
            sequence_number: 15,
        });
    }

    #[test]
    fn user_control_round_trips() {
        round_trip(RtmpMessage::UserControl {
            event_type: UserControlEventType::StreamBegin,
            stream_id: Some(15),
            buffer_length: None,
            timestamp: None,
        });
    }

    #[test]
    fn window_acknowledgement_round_trips() {
        round_trip(RtmpMessage::WindowAcknowledgement { size: 25 });
    }

    #[test]
    fn set_peer_bandwidth_round_trips() {
        round_trip(RtmpMessage::SetPeerBandwidth {
            size: 15,
            limit_type: PeerBandwidthLimitType::Hard,
        });
    }

    #[test]
    fn audio_data_round_trips() {
        round_trip(RtmpMessage::AudioData {
            data: Bytes::from(vec![3_u8]),
        });
    }

    #[test]
    fn video_data_round_trips() {
        round_trip(RtmpMessage::VideoData {
            data: Bytes::from(vec![4_u8]),
        });
    }

    #[test]
    fn amf0_data_round_trips() {
        round_trip(RtmpMessage::Amf0Data {
            values: vec![Amf0Value::Number(23.3)],
        });
    }

    #[test]
    fn amf0_command_round_trips() {
        round_trip(RtmpMessage::Amf0Command {
            command_name: "connect".to_string(),
            transaction_id: 1.0,
            command_object: Amf0Value::Object(vec![(
                "app".to_string(),
                Amf0Value::Utf8String("live".to_string()),
            )]),
            additional_arguments: vec![Amf0Value::Null],
        });
    }

    #[test]
    fn unknown_type_id_round_trips_untouched() {
        round_trip(RtmpMessage::Unknown {
            type_id: 33,
            data: Bytes::from(vec![23_u8]),
        });
    }
}
