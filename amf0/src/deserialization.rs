//! Functionality for decoding AMF0 encoded bytes back into values.

use crate::errors::Amf0DeserializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Reads AMF0 values out of a readable byte stream until it is exhausted.
///
/// An unknown type marker does not fail the call.  Since the rest of the buffer
/// can no longer be framed, parsing stops, an `Amf0Value::Unsupported` sentinel
/// is appended, and whatever was decoded up to that point is returned.
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut results = vec![];
    let mut halted = false;

    while !halted {
        match read_next_value(bytes, &mut halted)? {
            Some(value) => results.push(value),
            None => break,
        };
    }

    Ok(results)
}

fn read_next_value<R: Read>(
    bytes: &mut R,
    halted: &mut bool,
) -> Result<Option<Amf0Value>, Amf0DeserializationError> {
    let mut marker: [u8; 1] = [0];
    let bytes_read = bytes.read(&mut marker)?;

    if bytes_read == 0 {
        return Ok(None);
    }

    match marker[0] {
        markers::NUMBER_MARKER => parse_number(bytes).map(Some),
        markers::BOOLEAN_MARKER => parse_bool(bytes).map(Some),
        markers::STRING_MARKER => parse_string(bytes).map(Some),
        markers::LONG_STRING_MARKER => parse_long_string(bytes).map(Some),
        markers::OBJECT_MARKER => parse_object(bytes, halted).map(Some),
        markers::ECMA_ARRAY_MARKER => parse_ecma_array(bytes, halted).map(Some),
        markers::STRICT_ARRAY_MARKER => parse_strict_array(bytes, halted).map(Some),
        markers::NULL_MARKER => Ok(Some(Amf0Value::Null)),
        markers::UNDEFINED_MARKER => Ok(Some(Amf0Value::Undefined)),
        markers::REFERENCE_MARKER => parse_reference(bytes).map(Some),
        markers::DATE_MARKER => parse_date(bytes).map(Some),
        markers::UNSUPPORTED_MARKER => Ok(Some(Amf0Value::Unsupported)),
        _ => {
            *halted = true;
            Ok(Some(Amf0Value::Unsupported))
        }
    }
}

fn parse_number<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let number = bytes.read_f64::<BigEndian>()?;
    Ok(Amf0Value::Number(number))
}

fn parse_bool<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let value = bytes.read_u8()?;
    Ok(Amf0Value::Boolean(value != 0))
}

fn parse_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let value = read_utf8(bytes, length as usize)?;
    Ok(Amf0Value::Utf8String(value))
}

fn parse_long_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let length = bytes.read_u32::<BigEndian>()?;
    let value = read_utf8(bytes, length as usize)?;
    Ok(Amf0Value::LongUtf8String(value))
}

fn parse_reference<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let index = bytes.read_u16::<BigEndian>()?;
    Ok(Amf0Value::Reference(index))
}

fn parse_date<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let millis = bytes.read_f64::<BigEndian>()?;
    let _timezone = bytes.read_u16::<BigEndian>()?; // always written as zero
    Ok(Amf0Value::Date(millis))
}

fn parse_object<R: Read>(
    bytes: &mut R,
    halted: &mut bool,
) -> Result<Amf0Value, Amf0DeserializationError> {
    let properties = parse_properties(bytes, halted)?;
    Ok(Amf0Value::Object(properties))
}

fn parse_ecma_array<R: Read>(
    bytes: &mut R,
    halted: &mut bool,
) -> Result<Amf0Value, Amf0DeserializationError> {
    // The advertised element count is not trusted.  The 0x000009 terminator is
    // what actually delimits the array on the wire, so read it exactly like an
    // object body.
    let _element_count = bytes.read_u32::<BigEndian>()?;
    let properties = parse_properties(bytes, halted)?;
    Ok(Amf0Value::EcmaArray(properties))
}

fn parse_strict_array<R: Read>(
    bytes: &mut R,
    halted: &mut bool,
) -> Result<Amf0Value, Amf0DeserializationError> {
    let element_count = bytes.read_u32::<BigEndian>()?;
    let mut values = Vec::new();

    for _ in 0..element_count {
        match read_next_value(bytes, halted)? {
            Some(value) => values.push(value),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        };

        if *halted {
            break;
        }
    }

    Ok(Amf0Value::StrictArray(values))
}

fn parse_properties<R: Read>(
    bytes: &mut R,
    halted: &mut bool,
) -> Result<Vec<(String, Amf0Value)>, Amf0DeserializationError> {
    let mut properties = Vec::new();

    loop {
        let label_length = bytes.read_u16::<BigEndian>()?;
        if label_length == 0 {
            // Zero length label means the terminator, consume the end marker
            let marker = bytes.read_u8()?;
            if marker != markers::OBJECT_END_MARKER {
                return Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName);
            }

            break;
        }

        let label = read_utf8(bytes, label_length as usize)?;
        match read_next_value(bytes, halted)? {
            Some(value) => properties.push((label, value)),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        };

        if *halted {
            break;
        }
    }

    Ok(properties)
}

fn read_utf8<R: Read>(bytes: &mut R, length: usize) -> Result<String, Amf0DeserializationError> {
    let mut buffer = vec![0_u8; length];
    bytes.read_exact(&mut buffer)?;

    let value = String::from_utf8(buffer)?;
    Ok(value)
}
