//! Binary encoder for context data frames.
//!
//! A frame carries one map so that it can be persisted or shipped to another
//! process and rebuilt there as an equal map.
//!
//! # Frame Format
//!
//! All integers are little-endian.
//!
//! ```text
//! magic "CTXM" (4) | version (1) | flags (1) | capacity (4) | size (4)
//! [ body_len (4) ]                        only when the LZ4 flag is set
//! entries...                              LZ4-compressed when the flag is set
//!
//! entry := key_len (4) | key bytes        key_len 0xFFFF_FFFF is the null key
//!          marker (1)                     0 = null value, 1 = value follows
//!          [ value_len (4) | payload ]    payload as written by Loggable
//! ```
//!
//! Frames can be concatenated; the reader consumes them one at a time.

use std::io::Write;

use crate::error::CodecError;
use crate::loggable::Loggable;
use crate::sorted_array_map::SortedArrayMap;

/// Magic bytes at the start of every frame.
pub const FRAME_MAGIC: &[u8; 4] = b"CTXM";

/// Current frame format version.
pub const FRAME_VERSION: u8 = 1;

/// Flag bit: the entry section is LZ4-compressed.
pub const FLAG_LZ4: u8 = 0x01;

/// Size of the fixed frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4 + 1 + 1 + 4 + 4;

/// Key length marking the null key.
pub(crate) const NULL_KEY_LEN: u32 = u32::MAX;

pub(crate) const VALUE_NULL: u8 = 0;
pub(crate) const VALUE_PRESENT: u8 = 1;

/// Writes maps as context data frames.
///
/// # Examples
///
/// ```
/// # use context_data::{SortedArrayMap, ContextDataWriter, ContextDataReader};
/// let mut map: SortedArrayMap<String> = SortedArrayMap::new();
/// map.put("user", "alice".to_string()).unwrap();
///
/// let frame = ContextDataWriter::new().encode(&map).unwrap();
/// let copy: SortedArrayMap<String> = ContextDataReader::new(&frame).read_map().unwrap();
/// assert_eq!(copy, map);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextDataWriter {
    compress: bool,
}

impl ContextDataWriter {
    /// Creates a writer producing uncompressed frames.
    pub const fn new() -> Self {
        Self { compress: false }
    }

    /// Creates a writer producing LZ4-compressed frames.
    pub const fn compressed() -> Self {
        Self { compress: true }
    }

    /// Encodes `map` into a new frame.
    ///
    /// Values whose [`Loggable::serialize`] declines are written as null;
    /// everything else in the frame is unaffected.
    pub fn encode<V: Loggable>(&self, map: &SortedArrayMap<V>) -> Result<Vec<u8>, CodecError> {
        let mut entries = Vec::with_capacity(map.len() * 16);
        let mut scratch = Vec::new();

        for (key, value) in map {
            match key {
                Some(key) => {
                    write_len(&mut entries, key.len())?;
                    entries.extend_from_slice(key.as_bytes());
                }
                None => entries.extend_from_slice(&NULL_KEY_LEN.to_le_bytes()),
            }

            scratch.clear();
            match value {
                Some(value) if value.serialize(&mut scratch) => {
                    entries.push(VALUE_PRESENT);
                    write_len(&mut entries, scratch.len())?;
                    entries.extend_from_slice(&scratch);
                }
                Some(_) => {
                    tracing::debug!(
                        key = key.unwrap_or("null"),
                        "context value is not serializable, writing null"
                    );
                    entries.push(VALUE_NULL);
                }
                None => entries.push(VALUE_NULL),
            }
        }

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + 4 + entries.len());
        frame.extend_from_slice(FRAME_MAGIC);
        frame.push(FRAME_VERSION);
        frame.push(if self.compress { FLAG_LZ4 } else { 0 });
        write_len(&mut frame, map.capacity())?;
        write_len(&mut frame, map.len())?;

        if self.compress {
            let body = lz4_flex::compress_prepend_size(&entries);
            write_len(&mut frame, body.len())?;
            frame.extend_from_slice(&body);
        } else {
            frame.extend_from_slice(&entries);
        }
        Ok(frame)
    }

    /// Encodes `map` and writes the frame to `writer`.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    pub fn write_to<V: Loggable, W: Write>(
        &self,
        map: &SortedArrayMap<V>,
        writer: &mut W,
    ) -> Result<usize, CodecError> {
        let frame = self.encode(map)?;
        writer.write_all(&frame)?;
        Ok(frame.len())
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len)
        .ok()
        .filter(|&len| len != NULL_KEY_LEN)
        .ok_or_else(|| CodecError::TooLarge(format!("length {} exceeds frame limits", len)))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

/// Encodes `map` into an uncompressed frame.
pub fn encode<V: Loggable>(map: &SortedArrayMap<V>) -> Result<Vec<u8>, CodecError> {
    ContextDataWriter::new().encode(map)
}
