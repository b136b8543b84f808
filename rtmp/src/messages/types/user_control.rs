use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::{Cursor, Write};

use crate::messages::{
    MessageDeserializationError, MessageSerializationError, RtmpMessage, UserControlEventType,
};
use crate::time::RtmpTimestamp;

pub fn serialize(
    event_type: UserControlEventType,
    stream_id: Option<u32>,
    buffer_length: Option<u32>,
    timestamp: Option<RtmpTimestamp>,
) -> Result<Bytes, MessageSerializationError> {
    let mut cursor = Cursor::new(Vec::new());
    match event_type {
        UserControlEventType::StreamBegin => write_stream_event(&mut cursor, 0, stream_id)?,
        UserControlEventType::StreamEof => write_stream_event(&mut cursor, 1, stream_id)?,
        UserControlEventType::StreamDry => write_stream_event(&mut cursor, 2, stream_id)?,
        UserControlEventType::SetBufferLength => {
            write_length_event(&mut cursor, 3, stream_id, buffer_length)?
        }
        UserControlEventType::StreamIsRecorded => write_stream_event(&mut cursor, 4, stream_id)?,
        UserControlEventType::PingRequest => write_timestamp_event(&mut cursor, 6, timestamp)?,
        UserControlEventType::PingResponse => write_timestamp_event(&mut cursor, 7, timestamp)?,
    };

    Ok(Bytes::from(cursor.into_inner()))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let event_type = match cursor.read_u16::<BigEndian>()? {
        0 => UserControlEventType::StreamBegin,
        1 => UserControlEventType::StreamEof,
        2 => UserControlEventType::StreamDry,
        3 => UserControlEventType::SetBufferLength,
        4 => UserControlEventType::StreamIsRecorded,
        6 => UserControlEventType::PingRequest,
        7 => UserControlEventType::PingResponse,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let mut stream_id = None;
    let mut buffer_length = None;
    let mut timestamp = None;

    match event_type {
        UserControlEventType::StreamBegin
        | UserControlEventType::StreamEof
        | UserControlEventType::StreamDry
        | UserControlEventType::StreamIsRecorded => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?)
        }

        UserControlEventType::SetBufferLength => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            buffer_length = Some(cursor.read_u32::<BigEndian>()?);
        }

        UserControlEventType::PingRequest | UserControlEventType::PingResponse => {
            timestamp = Some(RtmpTimestamp::new(cursor.read_u32::<BigEndian>()?))
        }
    }

    Ok(RtmpMessage::UserControl {
        event_type,
        stream_id,
        buffer_length,
        timestamp,
    })
}

fn write_stream_event<W: Write>(
    bytes: &mut W,
    event_id: u16,
    stream_id: Option<u32>,
) -> Result<(), MessageSerializationError> {
    debug_assert!(
        stream_id.is_some(),
        "Stream event serialized with a None stream id"
    );

    bytes.write_u16::<BigEndian>(event_id)?;
    bytes.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
    Ok(())
}

fn write_length_event<W: Write>(
    bytes: &mut W,
    event_id: u16,
    stream_id: Option<u32>,
    length: Option<u32>,
) -> Result<(), MessageSerializationError> {
    debug_assert!(
        stream_id.is_some() && length.is_some(),
        "Buffer length event serialized with a None field"
    );

    bytes.write_u16::<BigEndian>(event_id)?;
    bytes.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
    bytes.write_u32::<BigEndian>(length.unwrap_or(0))?;
    Ok(())
}

fn write_timestamp_event<W: Write>(
    bytes: &mut W,
    event_id: u16,
    timestamp: Option<RtmpTimestamp>,
) -> Result<(), MessageSerializationError> {
    debug_assert!(
        timestamp.is_some(),
        "Timestamp event serialized with a None timestamp"
    );

    bytes.write_u16::<BigEndian>(event_id)?;
    bytes.write_u32::<BigEndian>(timestamp.map(|x| x.value).unwrap_or(0))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::{RtmpMessage, UserControlEventType};
    use crate::time::RtmpTimestamp;
    use byteorder::{BigEndian, WriteBytesExt};
    use bytes::Bytes;
    use std::io::Cursor;

    #[test]
    fn can_serialize_stream_begin_event() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u16::<BigEndian>(0).unwrap();
        cursor.write_u32::<BigEndian>(555).unwrap();
        let expected = cursor.into_inner();

        let result = serialize(UserControlEventType::StreamBegin, Some(555), None, None).unwrap();
        assert_eq!(&result[..], &expected[..]);
    }

    #[test]
    fn can_serialize_set_buffer_length_event() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u16::<BigEndian>(3).unwrap();
        cursor.write_u32::<BigEndian>(555).unwrap();
        cursor.write_u32::<BigEndian>(666).unwrap();
        let expected = cursor.into_inner();

        let result = serialize(
            UserControlEventType::SetBufferLength,
            Some(555),
            Some(666),
            None,
        )
        .unwrap();
        assert_eq!(&result[..], &expected[..]);
    }

    #[test]
    fn can_serialize_ping_response_event() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u16::<BigEndian>(7).unwrap();
        cursor.write_u32::<BigEndian>(999).unwrap();
        let expected = cursor.into_inner();

        let result = serialize(
            UserControlEventType::PingResponse,
            None,
            None,
            Some(RtmpTimestamp::new(999)),
        )
        .unwrap();
        assert_eq!(&result[..], &expected[..]);
    }

    #[test]
    fn can_deserialize_ping_request_event() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u16::<BigEndian>(6).unwrap();
        cursor.write_u32::<BigEndian>(999).unwrap();

        let result = deserialize(Bytes::from(cursor.into_inner())).unwrap();
        assert_eq!(
            result,
            RtmpMessage::UserControl {
                event_type: UserControlEventType::PingRequest,
                stream_id: None,
                buffer_length: None,
                timestamp: Some(RtmpTimestamp::new(999)),
            }
        );
    }

    #[test]
    fn can_deserialize_stream_begin_event() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u16::<BigEndian>(0).unwrap();
        cursor.write_u32::<BigEndian>(12).unwrap();

        let result = deserialize(Bytes::from(cursor.into_inner())).unwrap();
        assert_eq!(
            result,
            RtmpMessage::UserControl {
                event_type: UserControlEventType::StreamBegin,
                stream_id: Some(12),
                buffer_length: None,
                timestamp: None,
            }
        );
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u16::<BigEndian>(55).unwrap();
        cursor.write_u32::<BigEndian>(12).unwrap();

        let result = deserialize(Bytes::from(cursor.into_inner()));
        assert!(result.is_err(), "Expected unknown event type to error");
    }
}
