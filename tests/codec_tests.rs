use context_data::context_writer::{FLAG_LZ4, FRAME_HEADER_SIZE};
use context_data::{
    decode, encode, read_from, CodecError, ContextDataReader, ContextDataWriter, ContextValue,
    SortedArrayMap, NULL_KEY,
};
use std::fs::File;
use tempfile::tempdir;

fn sample() -> SortedArrayMap<ContextValue> {
    let mut map: SortedArrayMap<ContextValue> = SortedArrayMap::new();
    map.put("attempt", ContextValue::Integer(3)).unwrap();
    map.put("cached", ContextValue::Boolean(false)).unwrap();
    map.put("latency", ContextValue::Float(12.5)).unwrap();
    map.put("user", ContextValue::from("alice")).unwrap();
    map.put("missing", None::<ContextValue>).unwrap();
    map.put(NULL_KEY, ContextValue::from("anonymous")).unwrap();
    map
}

#[test]
fn test_round_trip_mixed_values() {
    let map = sample();
    let frame = encode(&map).unwrap();
    let decoded: SortedArrayMap<ContextValue> = decode(&frame).unwrap();

    assert_eq!(decoded, map);
    assert!(!decoded.is_frozen());
    assert_eq!(decoded.get("user").and_then(ContextValue::as_str), Some("alice"));
    assert_eq!(decoded.get_entry("missing"), Some(None));
}

#[test]
fn test_round_trip_keeps_capacity() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::with_capacity(8).unwrap();
    map.put("a", "1".to_string()).unwrap();
    map.put("b", "2".to_string()).unwrap();
    map.put("c", "3".to_string()).unwrap();

    let decoded: SortedArrayMap<String> = decode(&encode(&map).unwrap()).unwrap();
    assert_eq!(decoded, map);
    assert!(decoded.capacity() >= 6);
}

#[test]
fn test_frozen_map_decodes_unfrozen() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    map.put("k", "v".to_string()).unwrap();
    map.freeze();

    let mut decoded: SortedArrayMap<String> = decode(&encode(&map).unwrap()).unwrap();
    assert_eq!(decoded, map);
    decoded.put("more", "ok".to_string()).unwrap();
}

#[test]
fn test_opaque_value_becomes_null() {
    let mut map: SortedArrayMap<ContextValue> = SortedArrayMap::new();
    map.put("before", ContextValue::from("a")).unwrap();
    map.put("handle", ContextValue::opaque(vec![1u8, 2, 3])).unwrap();
    map.put("next", ContextValue::from(7i64)).unwrap();

    let decoded: SortedArrayMap<ContextValue> = decode(&encode(&map).unwrap()).unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded.get_entry("handle"), Some(None));
    assert_eq!(decoded.get("before"), Some(&ContextValue::from("a")));
    assert_eq!(decoded.get("next").and_then(ContextValue::as_integer), Some(7));
}

#[test]
fn test_type_mismatch_becomes_null() {
    let mut map: SortedArrayMap<ContextValue> = SortedArrayMap::new();
    map.put("count", ContextValue::Integer(42)).unwrap();
    map.put("name", ContextValue::from("svc")).unwrap();

    // a reader expecting strings keeps the keys but cannot decode the integer
    let decoded: SortedArrayMap<String> = decode(&encode(&map).unwrap()).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get_entry("count"), Some(None));
    assert_eq!(decoded.get("name").map(String::as_str), Some("svc"));
}

#[test]
fn test_compressed_round_trip() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    for i in 0..50 {
        map.put(format!("key-{i:02}"), "the same value repeated".to_string()).unwrap();
    }
    let plain = ContextDataWriter::new().encode(&map).unwrap();
    let packed = ContextDataWriter::compressed().encode(&map).unwrap();
    assert_eq!(packed[5] & FLAG_LZ4, FLAG_LZ4);
    assert!(packed.len() < plain.len());

    let decoded: SortedArrayMap<String> = decode(&packed).unwrap();
    assert_eq!(decoded, map);
}

#[test]
fn test_concatenated_frames() {
    let mut first: SortedArrayMap<String> = SortedArrayMap::new();
    first.put("n", "1".to_string()).unwrap();
    let mut second: SortedArrayMap<String> = SortedArrayMap::new();
    second.put("n", "2".to_string()).unwrap();

    let mut data = ContextDataWriter::compressed().encode(&first).unwrap();
    data.extend(ContextDataWriter::new().encode(&second).unwrap());
    data.extend(ContextDataWriter::new().encode(&SortedArrayMap::<String>::new()).unwrap());

    let mut reader = ContextDataReader::new(&data);
    assert_eq!(reader.read_map::<String>().unwrap(), first);
    assert_eq!(reader.read_map::<String>().unwrap(), second);
    assert!(reader.read_map::<String>().unwrap().is_empty());
    assert!(reader.is_at_end());
    assert_eq!(reader.position(), data.len());
}

#[test]
fn test_bad_magic_and_version() {
    let map: SortedArrayMap<String> = SortedArrayMap::new();
    let mut frame = encode(&map).unwrap();

    let mut wrong_magic = frame.clone();
    wrong_magic[0] = b'X';
    assert!(matches!(decode::<String>(&wrong_magic), Err(CodecError::BadMagic)));

    frame[4] = 99;
    assert!(matches!(
        decode::<String>(&frame),
        Err(CodecError::UnsupportedVersion(99))
    ));
}

#[test]
fn test_truncated_frames() {
    let frame = encode(&sample()).unwrap();
    assert!(matches!(decode::<ContextValue>(&[]), Err(CodecError::Truncated(_))));
    assert!(matches!(
        decode::<ContextValue>(&frame[..FRAME_HEADER_SIZE - 1]),
        Err(CodecError::Truncated(_))
    ));
    assert!(matches!(
        decode::<ContextValue>(&frame[..frame.len() - 1]),
        Err(CodecError::Truncated(_))
    ));
}

#[test]
fn test_oversized_entry_count_is_rejected() {
    let mut frame = encode(&SortedArrayMap::<String>::new()).unwrap();
    frame[10..14].copy_from_slice(&u32::MAX.to_le_bytes());
    frame[6..10].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(decode::<String>(&frame), Err(CodecError::Truncated(_))));
}

#[test]
fn test_invalid_marker() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    map.put("k", None::<String>).unwrap();
    let mut frame = encode(&map).unwrap();
    // header, key_len (4), "k", marker
    let marker = FRAME_HEADER_SIZE + 4 + 1;
    frame[marker] = 7;
    assert!(matches!(
        decode::<String>(&frame),
        Err(CodecError::InvalidMarker { entry: 0, marker: 7 })
    ));
}

#[test]
fn test_unordered_keys_are_rejected() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    map.put("a", None::<String>).unwrap();
    map.put("b", None::<String>).unwrap();
    let mut frame = encode(&map).unwrap();
    // swap the two single-byte keys
    let first = FRAME_HEADER_SIZE + 4;
    let second = first + 1 + 1 + 4;
    frame.swap(first, second);
    assert!(matches!(decode::<String>(&frame), Err(CodecError::Unordered(1))));
}

#[test]
fn test_invalid_utf8_key() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    map.put("k", None::<String>).unwrap();
    let mut frame = encode(&map).unwrap();
    frame[FRAME_HEADER_SIZE + 4] = 0xFF;
    assert!(matches!(decode::<String>(&frame), Err(CodecError::InvalidKey(0))));
}

#[test]
fn test_corrupt_compressed_body() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    map.put("k", "v".repeat(64)).unwrap();
    let mut frame = ContextDataWriter::compressed().encode(&map).unwrap();
    // claim a decompressed size smaller than the real one
    let body = FRAME_HEADER_SIZE + 4;
    frame[body..body + 4].copy_from_slice(&1u32.to_le_bytes());
    assert!(matches!(decode::<String>(&frame), Err(CodecError::Decompress(_))));
}

#[test]
fn test_compressed_body_with_extra_entries() {
    let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    map.put("a", "1".to_string()).unwrap();
    map.put("b", "2".to_string()).unwrap();
    let mut frame = ContextDataWriter::compressed().encode(&map).unwrap();
    // announce one entry while the body still holds two
    frame[10..14].copy_from_slice(&1u32.to_le_bytes());
    assert!(matches!(decode::<String>(&frame), Err(CodecError::TrailingBytes(n)) if n > 0));
}

#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("context.bin");
    let map = sample();

    let written = {
        let mut file = File::create(&path).unwrap();
        ContextDataWriter::compressed().write_to(&map, &mut file).unwrap()
    };
    assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, written);

    let mut file = File::open(&path).unwrap();
    let decoded: SortedArrayMap<ContextValue> = read_from(&mut file).unwrap();
    assert_eq!(decoded, map);
}

#[test]
fn test_read_from_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    File::create(&path).unwrap();
    let mut file = File::open(&path).unwrap();
    assert!(matches!(
        read_from::<String, _>(&mut file),
        Err(CodecError::Truncated(0))
    ));
}
