/// Payload tag for signed integers (8 bytes, little-endian `i64`).
pub const TAG_INTEGER: u8 = 1;
/// Payload tag for booleans (1 byte).
pub const TAG_BOOLEAN: u8 = 2;
/// Payload tag for floats (8 bytes, little-endian `f64`).
pub const TAG_FLOAT: u8 = 3;
/// Payload tag for UTF-8 strings (remaining bytes).
pub const TAG_STRING: u8 = 4;

/// A value that can travel inside a context data frame.
///
/// The payload written by `serialize` always starts with one of the `TAG_*`
/// bytes. A typed decoder only accepts its own tag, so a value stored as an
/// integer cannot be read back as a string; the frame reader then substitutes
/// a null value for that entry and keeps going.
pub trait Loggable: Sized {
    /// Appends the encoded payload to `buf`.
    ///
    /// Returns `false` (and leaves `buf` untouched) when the value cannot be
    /// carried, in which case it is transmitted as null.
    fn serialize(&self, buf: &mut Vec<u8>) -> bool;

    /// Rebuilds a value from a payload, or `None` if the payload is not one
    /// this type understands.
    fn deserialize(payload: &[u8]) -> Option<Self>;
}

pub(crate) fn write_integer(value: i64, buf: &mut Vec<u8>) {
    buf.push(TAG_INTEGER);
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_integer(payload: &[u8]) -> Option<i64> {
    match payload {
        [TAG_INTEGER, rest @ ..] => Some(i64::from_le_bytes(rest.try_into().ok()?)),
        _ => None,
    }
}

pub(crate) fn write_boolean(value: bool, buf: &mut Vec<u8>) {
    buf.push(TAG_BOOLEAN);
    buf.push(value as u8);
}

pub(crate) fn read_boolean(payload: &[u8]) -> Option<bool> {
    match payload {
        [TAG_BOOLEAN, 0] => Some(false),
        [TAG_BOOLEAN, 1] => Some(true),
        _ => None,
    }
}

pub(crate) fn write_float(value: f64, buf: &mut Vec<u8>) {
    buf.push(TAG_FLOAT);
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_float(payload: &[u8]) -> Option<f64> {
    match payload {
        [TAG_FLOAT, rest @ ..] => Some(f64::from_le_bytes(rest.try_into().ok()?)),
        _ => None,
    }
}

pub(crate) fn write_string(value: &str, buf: &mut Vec<u8>) {
    buf.push(TAG_STRING);
    buf.extend_from_slice(value.as_bytes());
}

pub(crate) fn read_string(payload: &[u8]) -> Option<String> {
    match payload {
        [TAG_STRING, rest @ ..] => String::from_utf8(rest.to_vec()).ok(),
        _ => None,
    }
}

impl Loggable for String {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        write_string(self, buf);
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        read_string(payload)
    }
}

impl Loggable for i64 {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        write_integer(*self, buf);
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        read_integer(payload)
    }
}

impl Loggable for i32 {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        write_integer(i64::from(*self), buf);
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        read_integer(payload)?.try_into().ok()
    }
}

impl Loggable for u32 {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        write_integer(i64::from(*self), buf);
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        read_integer(payload)?.try_into().ok()
    }
}

impl Loggable for bool {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        write_boolean(*self, buf);
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        read_boolean(payload)
    }
}

impl Loggable for f64 {
    fn serialize(&self, buf: &mut Vec<u8>) -> bool {
        write_float(*self, buf);
        true
    }

    fn deserialize(payload: &[u8]) -> Option<Self> {
        read_float(payload)
    }
}
