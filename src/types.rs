// JDWP type definitions
//
// Common types used across the JDWP protocol

use crate::protocol::{JdwpError, JdwpResult};
use crate::reader;
use bytes::BufMut;
use serde::{Deserialize, Serialize};

// The Android debug profile uses 8 bytes for every ID kind. IDs are opaque:
// equality and map lookup are the only operations performed on them, and they
// must never be narrowed (the top bits are significant).
pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type StringId = ObjectId;
pub type ArrayId = ObjectId;

pub type ReferenceTypeId = u64;
pub type ClassId = ReferenceTypeId;

pub type MethodId = u64;
pub type FieldId = u64;
pub type FrameId = u64;

/// Value type tags (ASCII letters per the JDWP spec).
pub mod tag {
    pub const ARRAY: u8 = b'[';
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const OBJECT: u8 = b'L';
    pub const FLOAT: u8 = b'F';
    pub const DOUBLE: u8 = b'D';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const VOID: u8 = b'V';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const THREAD: u8 = b't';
    pub const THREAD_GROUP: u8 = b'g';
    pub const CLASS_LOADER: u8 = b'l';
    pub const CLASS_OBJECT: u8 = b'c';

    /// Reference tags carry an 8-byte object ID as their value.
    pub fn is_object(tag: u8) -> bool {
        matches!(
            tag,
            OBJECT | ARRAY | STRING | THREAD | THREAD_GROUP | CLASS_LOADER | CLASS_OBJECT
        )
    }
}

/// Reference type tags (class kind), used in locations and class lists.
pub mod type_tag {
    pub const CLASS: u8 = 1;
    pub const INTERFACE: u8 = 2;
    pub const ARRAY: u8 = 3;
}

// Location identifies a code position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub type_tag: u8, // 1=class, 2=interface, 3=array
    pub class_id: ReferenceTypeId,
    pub method_id: MethodId,
    pub index: u64, // bytecode index (PC)
}

impl Location {
    /// Wire size in the 8-byte ID profile.
    pub const WIRE_SIZE: usize = 25;

    pub fn method_entry(class_id: ReferenceTypeId, method_id: MethodId) -> Self {
        Self {
            type_tag: type_tag::CLASS,
            class_id,
            method_id,
            index: 0,
        }
    }
}

/// A 1-byte tag followed by an object ID; 9 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedObjectId {
    pub tag: u8,
    pub object_id: ObjectId,
}

impl TaggedObjectId {
    pub fn is_null(&self) -> bool {
        self.object_id == 0
    }
}

// Thread status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadStatus {
    Zombie,
    Running,
    Sleeping,
    Monitor,
    Wait,
}

impl ThreadStatus {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(ThreadStatus::Zombie),
            1 => Some(ThreadStatus::Running),
            2 => Some(ThreadStatus::Sleeping),
            3 => Some(ThreadStatus::Monitor),
            4 => Some(ThreadStatus::Wait),
            _ => None,
        }
    }
}

// Suspend status is a bit set; bit 0 = suspended by the debugger
pub const SUSPEND_STATUS_SUSPENDED: i32 = 1;

// Tagged value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub tag: u8,
    pub data: ValueData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueData {
    Byte(i8),
    Char(u16),
    Float(f32),
    Double(f64),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    Object(ObjectId),
    Void,
}

impl Value {
    pub fn int(v: i32) -> Self {
        Value {
            tag: tag::INT,
            data: ValueData::Int(v),
        }
    }

    pub fn string(id: StringId) -> Self {
        Value {
            tag: tag::STRING,
            data: ValueData::Object(id),
        }
    }

    pub fn object(id: ObjectId) -> Self {
        Value {
            tag: tag::OBJECT,
            data: ValueData::Object(id),
        }
    }

    /// Read a tagged value: tag byte, then the payload the tag implies.
    pub fn read(buf: &mut &[u8]) -> JdwpResult<Self> {
        let tag = reader::read_u8(buf)?;
        Self::read_untagged(tag, buf)
    }

    /// Read the payload for a known tag (array regions elide per-element tags).
    pub fn read_untagged(tag: u8, buf: &mut &[u8]) -> JdwpResult<Self> {
        let data = match tag {
            tag::BYTE => ValueData::Byte(reader::read_i8(buf)?),
            tag::CHAR => ValueData::Char(reader::read_u16(buf)?),
            tag::DOUBLE => ValueData::Double(reader::read_f64(buf)?),
            tag::FLOAT => ValueData::Float(reader::read_f32(buf)?),
            tag::INT => ValueData::Int(reader::read_i32(buf)?),
            tag::LONG => ValueData::Long(reader::read_i64(buf)?),
            tag::SHORT => ValueData::Short(reader::read_i16(buf)?),
            tag::BOOLEAN => ValueData::Boolean(reader::read_u8(buf)? != 0),
            tag::VOID => ValueData::Void,
            t if tag::is_object(t) => ValueData::Object(reader::read_u64(buf)?),
            t => {
                return Err(JdwpError::malformed(format!("unknown value tag: {t}")));
            }
        };

        Ok(Value { tag, data })
    }

    /// Write the tag byte followed by the payload, symmetric with `read`.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.tag);
        match &self.data {
            ValueData::Byte(v) => buf.put_i8(*v),
            ValueData::Char(v) => buf.put_u16(*v),
            ValueData::Double(v) => buf.put_f64(*v),
            ValueData::Float(v) => buf.put_f32(*v),
            ValueData::Int(v) => buf.put_i32(*v),
            ValueData::Long(v) => buf.put_i64(*v),
            ValueData::Short(v) => buf.put_i16(*v),
            ValueData::Boolean(v) => buf.put_u8(u8::from(*v)),
            ValueData::Object(id) => buf.put_u64(*id),
            ValueData::Void => {}
        }
    }

    /// The object ID carried by a reference-tagged value.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self.data {
            ValueData::Object(id) => Some(id),
            _ => None,
        }
    }

    /// Unwrap a non-null object reference, or report the actual tag.
    pub fn expect_object(&self) -> JdwpResult<ObjectId> {
        match self.data {
            ValueData::Object(id) if id != 0 => Ok(id),
            _ => Err(JdwpError::InvalidTag {
                expected: tag::OBJECT,
                actual: self.tag,
            }),
        }
    }

    pub fn expect_int(&self) -> JdwpResult<i32> {
        match self.data {
            ValueData::Int(v) => Ok(v),
            _ => Err(JdwpError::InvalidTag {
                expected: tag::INT,
                actual: self.tag,
            }),
        }
    }

    /// Format value for display
    pub fn format(&self) -> String {
        match &self.data {
            ValueData::Byte(v) => format!("(byte) {v}"),
            ValueData::Char(v) => {
                format!("(char) '{}'", char::from_u32(*v as u32).unwrap_or('?'))
            }
            ValueData::Float(v) => format!("(float) {v}"),
            ValueData::Double(v) => format!("(double) {v}"),
            ValueData::Int(v) => format!("(int) {v}"),
            ValueData::Long(v) => format!("(long) {v}"),
            ValueData::Short(v) => format!("(short) {v}"),
            ValueData::Boolean(v) => format!("(boolean) {v}"),
            ValueData::Object(id) => {
                if *id == 0 {
                    "(object) null".to_string()
                } else {
                    format!("(object) @{id:x}")
                }
            }
            ValueData::Void => "(void)".to_string(),
        }
    }
}

/// Map a JNI field/variable signature to its value tag.
///
/// Object signatures (`Lcom/...;`) and array signatures (`[I`) start with
/// their own tag byte; primitives are the tag itself.
pub fn signature_tag(signature: &str) -> JdwpResult<u8> {
    match signature.as_bytes().first() {
        Some(&b)
            if tag::is_object(b)
                || matches!(
                    b,
                    tag::BYTE
                        | tag::CHAR
                        | tag::DOUBLE
                        | tag::FLOAT
                        | tag::INT
                        | tag::LONG
                        | tag::SHORT
                        | tag::BOOLEAN
                ) =>
        {
            Ok(b)
        }
        _ => Err(JdwpError::malformed(format!(
            "unrecognized signature: {signature}"
        ))),
    }
}

// Variable information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub code_index: u64,
    pub name: String,
    pub signature: String,
    pub length: u32,
    pub slot: u32,
}

// Stack frame information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub location: Location,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_roundtrip_every_tag() {
        let values = vec![
            Value {
                tag: tag::BYTE,
                data: ValueData::Byte(-5),
            },
            Value {
                tag: tag::CHAR,
                data: ValueData::Char(0x263A),
            },
            Value {
                tag: tag::DOUBLE,
                data: ValueData::Double(2.5),
            },
            Value {
                tag: tag::FLOAT,
                data: ValueData::Float(-0.5),
            },
            Value::int(i32::MIN),
            Value {
                tag: tag::LONG,
                data: ValueData::Long(i64::MAX),
            },
            Value {
                tag: tag::SHORT,
                data: ValueData::Short(-32768),
            },
            Value {
                tag: tag::BOOLEAN,
                data: ValueData::Boolean(true),
            },
            Value {
                tag: tag::VOID,
                data: ValueData::Void,
            },
            Value::object(0xDEAD_BEEF_CAFE_0001),
            Value::string(0xFFFF_FFFF_FFFF_FFFF), // full 64-bit id survives
            Value {
                tag: tag::THREAD,
                data: ValueData::Object(0xCAFE),
            },
            Value {
                tag: tag::ARRAY,
                data: ValueData::Object(42),
            },
        ];

        for value in values {
            let mut buf = Vec::new();
            value.write(&mut buf);
            let mut slice = buf.as_slice();
            let decoded = Value::read(&mut slice).unwrap();
            assert_eq!(decoded, value);
            assert!(slice.is_empty(), "decode must consume exactly the payload");
        }
    }

    #[test]
    fn test_value_unknown_tag() {
        let mut buf: &[u8] = &[0xFF, 0, 0, 0, 0];
        assert!(matches!(
            Value::read(&mut buf),
            Err(JdwpError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_value_truncated_payload() {
        let mut buf: &[u8] = &[tag::LONG, 0, 1, 2];
        assert!(Value::read(&mut buf).is_err());
    }

    #[test]
    fn test_expect_object_rejects_null() {
        let null = Value::object(0);
        assert!(matches!(
            null.expect_object(),
            Err(JdwpError::InvalidTag { .. })
        ));
        assert_eq!(Value::object(7).expect_object().unwrap(), 7);
    }

    #[test]
    fn test_signature_tag() {
        assert_eq!(signature_tag("Ljava/lang/String;").unwrap(), tag::OBJECT);
        assert_eq!(signature_tag("[I").unwrap(), tag::ARRAY);
        assert_eq!(signature_tag("I").unwrap(), tag::INT);
        assert_eq!(signature_tag("Z").unwrap(), tag::BOOLEAN);
        assert!(signature_tag("Q").is_err());
        assert!(signature_tag("").is_err());
    }

    #[test]
    fn test_event_value_serializes_to_json() {
        // Callers persist inspection output as JSON; keep the shape stable.
        let value = Value::int(3);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["tag"], i32::from(tag::INT));
        assert_eq!(json["data"], 3);
    }
}
