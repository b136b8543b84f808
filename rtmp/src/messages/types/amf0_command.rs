use bytes::Bytes;
use mms_amf0::{deserialize as amf0_deserialize, serialize as amf0_serialize, Amf0Value};
use std::io::Cursor;

use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};

pub fn serialize(
    command_name: String,
    transaction_id: f64,
    command_object: Amf0Value,
    additional_arguments: Vec<Amf0Value>,
) -> Result<Bytes, MessageSerializationError> {
    let mut values = Vec::with_capacity(3 + additional_arguments.len());
    values.push(Amf0Value::Utf8String(command_name));
    values.push(Amf0Value::Number(transaction_id));
    values.push(command_object);
    values.extend(additional_arguments);

    let bytes = amf0_serialize(&values)?;
    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let mut values = amf0_deserialize(&mut cursor)?.into_iter();

    // Position 0 is the command name, position 1 the transaction id, position
    // 2 the command object (null for most commands), anything after that is
    // command specific
    let command_name = match values.next() {
        Some(Amf0Value::Utf8String(name)) => name,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let transaction_id = match values.next() {
        Some(Amf0Value::Number(id)) => id,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let command_object = values.next().unwrap_or(Amf0Value::Null);
    let additional_arguments = values.collect();

    Ok(RtmpMessage::Amf0Command {
        command_name,
        transaction_id,
        command_object,
        additional_arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::RtmpMessage;
    use bytes::Bytes;
    use mms_amf0::Amf0Value;

    #[test]
    fn command_survives_a_round_trip() {
        let object = Amf0Value::Object(vec![(
            "app".to_string(),
            Amf0Value::Utf8String("live".to_string()),
        )]);

        let bytes = serialize(
            "connect".to_string(),
            1.0,
            object.clone(),
            vec![Amf0Value::Utf8String("extra".to_string())],
        )
        .unwrap();

        let result = deserialize(bytes).unwrap();
        assert_eq!(
            result,
            RtmpMessage::Amf0Command {
                command_name: "connect".to_string(),
                transaction_id: 1.0,
                command_object: object,
                additional_arguments: vec![Amf0Value::Utf8String("extra".to_string())],
            }
        );
    }

    #[test]
    fn command_without_name_is_rejected() {
        let bytes = serialize("x".to_string(), 1.0, Amf0Value::Null, vec![]).unwrap();

        // Chop the name off the front so the first value is the number
        let result = deserialize(Bytes::from(bytes.slice(4..)));
        assert!(result.is_err(), "Expected malformed command to error");
    }
}
