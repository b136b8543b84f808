//! Functionality for encoding AMF0 values into their byte representation.

use crate::errors::Amf0SerializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, WriteBytesExt};

/// Serializes a sequence of values into an AMF0 encoded vector of bytes.
///
/// There is no wire representation for the sequence itself, the packed forms of
/// the individual values are simply concatenated.
pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = vec![];
    for value in values {
        serialize_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

fn serialize_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    match *value {
        Amf0Value::Number(val) => serialize_number(val, bytes),
        Amf0Value::Boolean(val) => Ok(serialize_bool(val, bytes)),
        Amf0Value::Utf8String(ref val) => serialize_string(val, bytes),
        Amf0Value::LongUtf8String(ref val) => serialize_long_string(val, bytes),
        Amf0Value::Object(ref properties) => serialize_object(properties, bytes),
        Amf0Value::EcmaArray(ref properties) => serialize_ecma_array(properties, bytes),
        Amf0Value::StrictArray(ref val) => serialize_strict_array(val, bytes),
        Amf0Value::Null => Ok(serialize_marker_only(markers::NULL_MARKER, bytes)),
        Amf0Value::Undefined => Ok(serialize_marker_only(markers::UNDEFINED_MARKER, bytes)),
        Amf0Value::Reference(index) => serialize_reference(index, bytes),
        Amf0Value::Date(val) => serialize_date(val, bytes),
        Amf0Value::Unsupported => Ok(serialize_marker_only(markers::UNSUPPORTED_MARKER, bytes)),
    }
}

fn serialize_number(value: f64, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::NUMBER_MARKER);
    bytes.write_f64::<BigEndian>(value)?;
    Ok(())
}

fn serialize_bool(value: bool, bytes: &mut Vec<u8>) {
    bytes.push(markers::BOOLEAN_MARKER);
    bytes.push(value as u8);
}

fn serialize_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    if value.len() > (u16::max_value() as usize) {
        // Too long for the short form, promote to the 4 byte length encoding
        return serialize_long_string(value, bytes);
    }

    bytes.push(markers::STRING_MARKER);
    bytes.write_u16::<BigEndian>(value.len() as u16)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_long_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::LONG_STRING_MARKER);
    bytes.write_u32::<BigEndian>(value.len() as u32)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_marker_only(marker: u8, bytes: &mut Vec<u8>) {
    bytes.push(marker);
}

fn serialize_reference(index: u16, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::REFERENCE_MARKER);
    bytes.write_u16::<BigEndian>(index)?;
    Ok(())
}

fn serialize_date(value: f64, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::DATE_MARKER);
    bytes.write_f64::<BigEndian>(value)?;
    bytes.write_u16::<BigEndian>(0)?; // timezone, always zero
    Ok(())
}

fn serialize_object(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::OBJECT_MARKER);
    serialize_properties(properties, bytes)?;
    Ok(())
}

fn serialize_ecma_array(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::ECMA_ARRAY_MARKER);

    // The count is always recomputed from the actual property list
    bytes.write_u32::<BigEndian>(properties.len() as u32)?;
    serialize_properties(properties, bytes)?;
    Ok(())
}

fn serialize_properties(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    for (name, value) in properties {
        if name.len() > (u16::max_value() as usize) {
            return Err(Amf0SerializationError::PropertyNameTooLong);
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)?;
    bytes.push(markers::OBJECT_END_MARKER);
    Ok(())
}

fn serialize_strict_array(
    array: &[Amf0Value],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::STRICT_ARRAY_MARKER);
    bytes.write_u32::<BigEndian>(array.len() as u32)?;

    for value in array {
        serialize_value(value, bytes)?;
    }

    Ok(())
}
