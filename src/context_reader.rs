//! Reader for decoding context data frames.
//!
//! This module rebuilds maps from the binary frames produced by
//! [`ContextDataWriter`](crate::ContextDataWriter). Damage to the frame
//! structure fails the whole decode, while a value the target type cannot
//! decode only turns that one value into null.

use std::borrow::Cow;
use std::io::Read;

use crate::context_writer::{
    FLAG_LZ4, FRAME_MAGIC, FRAME_VERSION, NULL_KEY_LEN, VALUE_NULL, VALUE_PRESENT,
};
use crate::error::CodecError;
use crate::loggable::Loggable;
use crate::sorted_array_map::{SortedArrayMap, DEFAULT_INITIAL_CAPACITY};

// smallest possible entry: null key + null value
const MIN_ENTRY_SIZE: usize = 4 + 1;

/// Reader for context data frames.
///
/// ContextDataReader walks a byte buffer holding one or more concatenated
/// frames and rebuilds one map per [`read_map`](Self::read_map) call.
///
/// # Examples
///
/// ```
/// # use context_data::{SortedArrayMap, ContextDataReader, ContextDataWriter};
/// let mut first: SortedArrayMap<i64> = SortedArrayMap::new();
/// first.put("attempt", 1).unwrap();
/// let mut second: SortedArrayMap<i64> = SortedArrayMap::new();
/// second.put("attempt", 2).unwrap();
///
/// let writer = ContextDataWriter::new();
/// let mut data = writer.encode(&first).unwrap();
/// data.extend(writer.encode(&second).unwrap());
///
/// let mut reader = ContextDataReader::new(&data);
/// let mut decoded = Vec::new();
/// while !reader.is_at_end() {
///     decoded.push(reader.read_map::<i64>().unwrap());
/// }
/// assert_eq!(decoded, vec![first, second]);
/// ```
pub struct ContextDataReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ContextDataReader<'a> {
    /// Creates a new reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Current read offset into the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decodes the next frame into a map.
    ///
    /// The result is always unfrozen. Values that `V` cannot decode become
    /// null and are reported with a `tracing` warning.
    ///
    /// # Errors
    ///
    /// * [`CodecError::BadMagic`] / [`CodecError::UnsupportedVersion`] - not a frame this
    ///   reader knows
    /// * [`CodecError::Truncated`] - the frame ends early
    /// * [`CodecError::InvalidKey`], [`CodecError::InvalidMarker`],
    ///   [`CodecError::Unordered`] - corrupt entries
    /// * [`CodecError::Decompress`] - the LZ4 body is damaged
    /// * [`CodecError::TrailingBytes`] - the LZ4 body holds more than `size` entries
    pub fn read_map<V: Loggable>(&mut self) -> Result<SortedArrayMap<V>, CodecError> {
        let magic = self.read_bytes(FRAME_MAGIC.len())?;
        if magic != FRAME_MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = self.read_u8()?;
        if version != FRAME_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let flags = self.read_u8()?;
        let capacity = self.read_u32()? as usize;
        let size = self.read_u32()? as usize;

        let body: Cow<'a, [u8]> = if flags & FLAG_LZ4 != 0 {
            let body_len = self.read_u32()? as usize;
            let packed = self.read_bytes(body_len)?;
            let unpacked = lz4_flex::decompress_size_prepended(packed)
                .map_err(|e| CodecError::Decompress(e.to_string()))?;
            Cow::Owned(unpacked)
        } else {
            let data = self.data;
            Cow::Borrowed(&data[self.pos..])
        };

        let mut entries = ContextDataReader::new(&body);
        let map = entries.read_entries(capacity, size)?;
        match body {
            // a plain body may be followed by the next frame
            Cow::Borrowed(_) => self.pos += entries.pos,
            Cow::Owned(_) if !entries.is_at_end() => {
                return Err(CodecError::TrailingBytes(entries.data.len() - entries.pos));
            }
            Cow::Owned(_) => {}
        }
        Ok(map)
    }

    fn read_entries<V: Loggable>(
        &mut self,
        capacity: usize,
        size: usize,
    ) -> Result<SortedArrayMap<V>, CodecError> {
        if size.saturating_mul(MIN_ENTRY_SIZE) > self.data.len() - self.pos {
            return Err(CodecError::Truncated(self.data.len()));
        }
        // never trust the announced capacity further than twice the size
        let capacity = capacity
            .min(size.saturating_mul(2).max(DEFAULT_INITIAL_CAPACITY))
            .max(size);
        let mut map = SortedArrayMap::with_capacity_or_empty(capacity);

        for entry in 0..size {
            let key_len = self.read_u32()?;
            let key = if key_len == NULL_KEY_LEN {
                None
            } else {
                let bytes = self.read_bytes(key_len as usize)?;
                let key = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidKey(entry))?;
                Some(key.to_owned())
            };

            // every key must land after the ones already read
            match map.index_of_key(key.as_deref()) {
                Err(slot) if slot == map.len() => {}
                _ => return Err(CodecError::Unordered(entry)),
            }

            let value = match self.read_u8()? {
                VALUE_NULL => None,
                VALUE_PRESENT => {
                    let len = self.read_u32()? as usize;
                    let payload = self.read_bytes(len)?;
                    let value = V::deserialize(payload);
                    if value.is_none() {
                        tracing::warn!(
                            entry,
                            key = key.as_deref().unwrap_or("null"),
                            payload_len = len,
                            "context value could not be decoded, substituting null"
                        );
                    }
                    value
                }
                marker => return Err(CodecError::InvalidMarker { entry, marker }),
            };

            map.put(key, value)?;
        }
        Ok(map)
    }

    /// Reads a single byte.
    fn read_u8(&mut self) -> Result<u8, CodecError> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads a little-endian 32-bit unsigned integer.
    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_bytes(4)?;
        let mut value = [0u8; 4];
        value.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(value))
    }

    /// Reads a slice of `len` bytes.
    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::Truncated(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

/// Decodes the first frame in `data`.
pub fn decode<V: Loggable>(data: &[u8]) -> Result<SortedArrayMap<V>, CodecError> {
    ContextDataReader::new(data).read_map()
}

/// Reads `reader` to the end and decodes the first frame in it.
pub fn read_from<V: Loggable, R: Read>(reader: &mut R) -> Result<SortedArrayMap<V>, CodecError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode(&data)
}
