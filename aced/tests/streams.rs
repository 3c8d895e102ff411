use std::io::Cursor;

use serde_json::json;

use aced::raw::{SID_HASH_MAP, SID_INTEGER};
use aced::structured::build::{new_byte_array, new_hash_map, new_linked_hash_map, new_string_array};
use aced::{deserialize_stream, project, serialize_entity, Error, Value};

fn read(bytes: &[u8]) -> Value {
	deserialize_stream(&mut Cursor::new(bytes)).unwrap()
}

fn write(value: &Value) -> Vec<u8> {
	let mut out = Vec::new();
	serialize_entity(&mut out, value).unwrap();
	out
}

fn push_utf(bytes: &mut Vec<u8>, s: &str) {
	bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
	bytes.extend_from_slice(s.as_bytes());
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
	haystack.windows(needle.len()).filter(|window| *window == needle).count()
}

const HELLO: &[u8] = &[
	0xAC, 0xED, 0x00, 0x05, 0x74, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o',
];

#[test]
fn a_lone_string_round_trips() {
	let value = read(HELLO);
	assert_eq!(project(&value), json!("hello"));
	assert_eq!(write(&value), HELLO);
}

// A String[] of length 2 whose second element is a back-reference to the
// first: the descriptor takes handle 0, the array handle 1, "x" handle 2.
const STRING_PAIR: &[u8] = &[
	0xAC, 0xED, 0x00, 0x05, 0x75, 0x72, 0x00, 0x13, b'[', b'L', b'j', b'a', b'v', b'a', b'/',
	b'l', b'a', b'n', b'g', b'/', b'S', b't', b'r', b'i', b'n', b'g', b';', 0xAD, 0xD2, 0x56,
	0xE7, 0xE9, 0x1D, 0x7B, 0x47, 0x02, 0x00, 0x00, 0x78, 0x70, 0x00, 0x00, 0x00, 0x02, 0x74,
	0x00, 0x01, b'x', 0x71, 0x00, 0x7E, 0x00, 0x02,
];

#[test]
fn string_arrays_resolve_back_references() {
	let value = read(STRING_PAIR);
	assert_eq!(project(&value), json!(["x", "x"]));
}

#[test]
fn string_arrays_re_emit_their_back_references() {
	assert_eq!(write(&read(STRING_PAIR)), STRING_PAIR);
}

#[test]
fn byte_arrays_serialize_to_the_standard_descriptor() {
	let expected: &[u8] = &[
		0xAC, 0xED, 0x00, 0x05, 0x75, 0x72, 0x00, 0x02, 0x5B, 0x42, 0xAC, 0xF3, 0x17, 0xF8,
		0x06, 0x08, 0x54, 0xE0, 0x02, 0x00, 0x00, 0x78, 0x70, 0x00, 0x00, 0x00, 0x04, 0x01,
		0x02, 0x03, 0x04,
	];
	let bytes = write(&new_byte_array(&[0x01, 0x02, 0x03, 0x04]));
	assert_eq!(bytes, expected);
	assert_eq!(project(&read(&bytes)), json!([1, 2, 3, 4]));
}

#[test]
fn integer_boxes_project_to_the_unboxed_value() {
	let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72];
	push_utf(&mut bytes, "java.lang.Integer");
	bytes.extend_from_slice(&SID_INTEGER.to_be_bytes());
	bytes.push(0x02);
	bytes.extend_from_slice(&[0x00, 0x01]);
	bytes.push(b'I');
	push_utf(&mut bytes, "value");
	bytes.extend_from_slice(&[0x78, 0x70]);
	bytes.extend_from_slice(&42u32.to_be_bytes());

	let value = read(&bytes);
	assert_eq!(project(&value), json!(42));
	// The box survives a write/read cycle with the same projection.
	assert_eq!(project(&read(&write(&value))), json!(42));
}

#[test]
fn hash_maps_emit_the_exact_custom_payload() {
	let map = new_hash_map(vec![
		(Value::String("a".into()), Value::String("b".into())),
		(Value::String("c".into()), Value::String("d".into())),
	]);

	let mut expected = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72];
	push_utf(&mut expected, "java.util.HashMap");
	expected.extend_from_slice(&SID_HASH_MAP.to_be_bytes());
	expected.push(0x03);
	expected.extend_from_slice(&[0x00, 0x02]);
	expected.push(b'F');
	push_utf(&mut expected, "loadFactor");
	expected.push(b'I');
	push_utf(&mut expected, "threshold");
	expected.extend_from_slice(&[0x78, 0x70]);
	expected.extend_from_slice(&[
		0x3F, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x77, 0x08, 0x00, 0x00, 0x00, 0x04,
		0x00, 0x00, 0x00, 0x02, 0x74, 0x00, 0x01, 0x61, 0x74, 0x00, 0x01, 0x62, 0x74, 0x00,
		0x01, 0x63, 0x74, 0x00, 0x01, 0x64, 0x78,
	]);

	let bytes = write(&map);
	assert_eq!(bytes, expected);
	assert_eq!(project(&read(&bytes)), json!({ "a": "b", "c": "d" }));
}

#[test]
fn map_payloads_require_the_eight_byte_block() {
	let mut bytes = write(&new_hash_map(vec![(
		Value::String("a".into()),
		Value::String("b".into()),
	)]));
	let block = count_occurrences(&bytes, &[0x77, 0x08]);
	assert_eq!(block, 1);
	let position = bytes.windows(2).position(|w| w == [0x77, 0x08]).unwrap();
	bytes[position + 1] = 0x06;
	assert!(matches!(
		deserialize_stream(&mut Cursor::new(&bytes[..])),
		Err(Error::UnexpectedTag { .. })
	));
}

#[test]
fn write_method_only_flags_are_rejected() {
	let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72];
	push_utf(&mut bytes, "A");
	bytes.extend_from_slice(&1u64.to_be_bytes());
	bytes.push(0x01);
	assert!(matches!(
		deserialize_stream(&mut Cursor::new(&bytes[..])),
		Err(Error::UnsupportedFlag(0x01))
	));
}

#[test]
fn linked_hash_maps_round_trip() {
	let map = new_linked_hash_map(vec![
		(Value::String("a".into()), Value::String("b".into())),
		(Value::String("c".into()), Value::String("d".into())),
	]);
	let first = project(&map);
	let reread = read(&write(&map));
	assert_eq!(project(&reread), first);
	assert_eq!(first, json!({ "a": "b", "c": "d" }));
}

#[test]
fn class_descriptors_are_emitted_once_per_uid() {
	let map = new_hash_map(vec![
		(Value::String("k1".into()), new_byte_array(&[1])),
		(Value::String("k2".into()), new_byte_array(&[2, 3])),
	]);
	let bytes = write(&map);
	// One TC_CLASSDESC for [B; the second array references it.
	assert_eq!(count_occurrences(&bytes, &[0x72, 0x00, 0x02, 0x5B, 0x42]), 1);
	assert_eq!(count_occurrences(&bytes, &[0x71, 0x00, 0x7E, 0x00, 0x03]), 1);
	assert_eq!(project(&read(&bytes)), json!({ "k1": [1], "k2": [2, 3] }));
}

#[test]
fn equal_strings_are_emitted_once() {
	let map = new_hash_map(vec![
		(Value::String("k1".into()), Value::String("v".into())),
		(Value::String("k2".into()), Value::String("v".into())),
	]);
	let bytes = write(&map);
	assert_eq!(count_occurrences(&bytes, &[0x74, 0x00, 0x01, b'v']), 1);
	assert_eq!(project(&read(&bytes)), json!({ "k1": "v", "k2": "v" }));
}

#[test]
fn array_list_payloads_read_as_sequences() {
	let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72];
	push_utf(&mut bytes, "java.util.ArrayList");
	bytes.extend_from_slice(&0x0102030405060708u64.to_be_bytes());
	bytes.extend_from_slice(&[0x03, 0x00, 0x00, 0x78, 0x70]);
	bytes.extend_from_slice(&2u32.to_be_bytes());
	bytes.extend_from_slice(&[0x77, 0x04]);
	bytes.extend_from_slice(&2u32.to_be_bytes());
	bytes.extend_from_slice(&[0x74, 0x00, 0x01, b'a', 0x74, 0x00, 0x01, b'b', 0x78]);

	assert_eq!(project(&read(&bytes)), json!(["a", "b"]));
}

#[test]
fn linked_list_payloads_read_as_sequences() {
	let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72];
	push_utf(&mut bytes, "java.util.LinkedList");
	bytes.extend_from_slice(&0x0102030405060708u64.to_be_bytes());
	bytes.extend_from_slice(&[0x03, 0x00, 0x00, 0x78, 0x70]);
	bytes.extend_from_slice(&[0x77, 0x04]);
	bytes.extend_from_slice(&1u32.to_be_bytes());
	bytes.extend_from_slice(&[0x74, 0x00, 0x01, b'z', 0x78]);

	assert_eq!(project(&read(&bytes)), json!(["z"]));
}

#[test]
fn list_payloads_do_not_serialize() {
	let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72];
	push_utf(&mut bytes, "java.util.LinkedList");
	bytes.extend_from_slice(&0x0102030405060708u64.to_be_bytes());
	bytes.extend_from_slice(&[0x03, 0x00, 0x00, 0x78, 0x70]);
	bytes.extend_from_slice(&[0x77, 0x04]);
	bytes.extend_from_slice(&0u32.to_be_bytes());
	bytes.push(0x78);

	let value = read(&bytes);
	let mut out = Vec::new();
	assert!(matches!(
		serialize_entity(&mut out, &value),
		Err(Error::UnsupportedCustomClass(name)) if name == "java.util.LinkedList"
	));
}

#[test]
fn streams_must_open_with_the_magic_header() {
	let bytes = [0xCA, 0xFE, 0x00, 0x05, 0x74, 0x00, 0x00];
	assert!(matches!(
		deserialize_stream(&mut Cursor::new(&bytes[..])),
		Err(Error::UnexpectedTag { expected: "STREAM_MAGIC", .. })
	));

	let bytes = [0xAC, 0xED, 0x00, 0x04, 0x74, 0x00, 0x00];
	assert!(matches!(
		deserialize_stream(&mut Cursor::new(&bytes[..])),
		Err(Error::UnexpectedTag { expected: "STREAM_VERSION", .. })
	));
}

#[test]
fn reset_and_friends_are_unsupported() {
	let bytes = [0xAC, 0xED, 0x00, 0x05, 0x79];
	assert!(matches!(
		deserialize_stream(&mut Cursor::new(&bytes[..])),
		Err(Error::UnsupportedTag(0x79))
	));
}

#[test]
fn a_null_body_decodes_to_null() {
	let value = read(&[0xAC, 0xED, 0x00, 0x05, 0x70]);
	assert!(matches!(value, Value::Null));
	assert_eq!(project(&value), json!(null));
}

#[test]
fn truncated_streams_fail_with_short_read() {
	let bytes = &HELLO[..HELLO.len() - 2];
	assert!(matches!(
		deserialize_stream(&mut Cursor::new(bytes)),
		Err(Error::ShortRead { .. })
	));
}

#[test]
fn string_array_builders_match_the_wire_dialect() {
	let bytes = write(&new_string_array(&["x", "x"]));
	assert_eq!(bytes, STRING_PAIR);
}
