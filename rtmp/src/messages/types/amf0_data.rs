use bytes::Bytes;
use mms_amf0::{deserialize as amf0_deserialize, serialize as amf0_serialize, Amf0Value};
use std::io::Cursor;

use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};

pub fn serialize(values: Vec<Amf0Value>) -> Result<Bytes, MessageSerializationError> {
    let bytes = amf0_serialize(&values)?;
    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let values = amf0_deserialize(&mut cursor)?;

    Ok(RtmpMessage::Amf0Data { values })
}
