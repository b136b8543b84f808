use bytes::Bytes;

use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};

pub fn serialize(data: Bytes) -> Result<Bytes, MessageSerializationError> {
    // Video payloads belong to the codec layer, pass them through verbatim
    Ok(data)
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::VideoData { data })
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::RtmpMessage;
    use bytes::Bytes;

    #[test]
    fn payload_passes_through_untouched() {
        let data = Bytes::from(vec![1_u8, 2, 3]);

        let serialized = serialize(data.clone()).unwrap();
        assert_eq!(serialized, data);

        let result = deserialize(serialized).unwrap();
        assert_eq!(result, RtmpMessage::VideoData { data });
    }
}
