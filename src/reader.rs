// Helper functions for reading and writing JDWP data types
//
// Every read helper checks remaining length first and never reads past the
// supplied slice; a short buffer is a MalformedPacket, not a panic.

use crate::protocol::{JdwpError, JdwpResult};
use crate::types::{Location, TaggedObjectId};
use bytes::{Buf, BufMut};

macro_rules! checked_read {
    ($name:ident, $ty:ty, $get:ident, $size:expr) => {
        pub fn $name(buf: &mut &[u8]) -> JdwpResult<$ty> {
            if buf.remaining() < $size {
                return Err(JdwpError::malformed(concat!(
                    "not enough data for ",
                    stringify!($ty)
                )));
            }
            Ok(buf.$get())
        }
    };
}

checked_read!(read_u8, u8, get_u8, 1);
checked_read!(read_i8, i8, get_i8, 1);
checked_read!(read_u16, u16, get_u16, 2);
checked_read!(read_i16, i16, get_i16, 2);
checked_read!(read_u32, u32, get_u32, 4);
checked_read!(read_i32, i32, get_i32, 4);
checked_read!(read_u64, u64, get_u64, 8);
checked_read!(read_i64, i64, get_i64, 8);
checked_read!(read_f32, f32, get_f32, 4);
checked_read!(read_f64, f64, get_f64, 8);

/// Read a JDWP string (4-byte length prefix + UTF-8 bytes)
pub fn read_string(buf: &mut &[u8]) -> JdwpResult<String> {
    let len = read_u32(buf)? as usize;

    if buf.remaining() < len {
        return Err(JdwpError::malformed(format!(
            "not enough data for string: expected {}, got {}",
            len,
            buf.remaining()
        )));
    }

    let bytes = &buf[..len];
    let text = String::from_utf8(bytes.to_vec())
        .map_err(|e| JdwpError::malformed(format!("invalid UTF-8 in string: {e}")))?;
    buf.advance(len);

    Ok(text)
}

/// Read a Location (type tag + class ID + method ID + index, 25 bytes)
pub fn read_location(buf: &mut &[u8]) -> JdwpResult<Location> {
    let type_tag = read_u8(buf)?;
    let class_id = read_u64(buf)?;
    let method_id = read_u64(buf)?;
    let index = read_u64(buf)?;

    Ok(Location {
        type_tag,
        class_id,
        method_id,
        index,
    })
}

/// Read a tagged object ID (tag byte + 8-byte object ID)
pub fn read_tagged_object_id(buf: &mut &[u8]) -> JdwpResult<TaggedObjectId> {
    let tag = read_u8(buf)?;
    let object_id = read_u64(buf)?;

    Ok(TaggedObjectId { tag, object_id })
}

/// Write a JDWP string (4-byte length prefix + UTF-8 bytes)
pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

/// Write a Location, symmetric with `read_location`
pub fn write_location(buf: &mut Vec<u8>, location: &Location) {
    buf.put_u8(location.type_tag);
    buf.put_u64(location.class_id);
    buf.put_u64(location.method_id);
    buf.put_u64(location.index);
}
