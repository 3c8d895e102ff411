use std::io::{Read, Write};

use fxhash::FxHashMap;

use crate::errors::{Error, Result};
use crate::raw::{string, Session, Tag, Value};
use crate::utilities::{FromByteStream, ToByteStream};

pub const HASH_MAP_CLASS: &str = "java.util.HashMap";
pub const LINKED_HASH_MAP_CLASS: &str = "java.util.LinkedHashMap";
pub const ARRAY_LIST_CLASS: &str = "java.util.ArrayList";
pub const LINKED_LIST_CLASS: &str = "java.util.LinkedList";

pub type CustomRead = fn(&mut dyn Read, &mut Session) -> Result<Value>;
pub type CustomWrite = fn(&mut dyn Write, &mut Session, &Value) -> Result<()>;

/// The read and (optional) write halves of one custom-writer class.
#[derive(Copy, Clone)]
pub struct Strategy {
	pub read: CustomRead,
	pub write: Option<CustomWrite>,
}

/// Dispatch table for classes whose descriptor carries the custom-writer
/// flag, keyed by class name and populated at session construction. Classes
/// without an entry fail with [Error::UnsupportedCustomClass].
pub struct CustomRegistry {
	strategies: FxHashMap<String, Strategy>,
}

impl Default for CustomRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

impl CustomRegistry {
	pub fn empty() -> Self {
		Self { strategies: FxHashMap::default() }
	}

	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();
		let map = Strategy { read: read_map_payload, write: Some(write_map_payload) };
		registry.insert(HASH_MAP_CLASS, map);
		registry.insert(LINKED_HASH_MAP_CLASS, map);
		registry.insert(ARRAY_LIST_CLASS, Strategy { read: read_array_list_payload, write: None });
		registry.insert(LINKED_LIST_CLASS, Strategy { read: read_linked_list_payload, write: None });
		registry
	}

	pub fn insert(&mut self, class_name: &str, strategy: Strategy) {
		self.strategies.insert(class_name.to_owned(), strategy);
	}

	pub(crate) fn reader(&self, class_name: &str) -> Result<CustomRead> {
		self.strategies
			.get(class_name)
			.map(|s| s.read)
			.ok_or_else(|| Error::UnsupportedCustomClass(class_name.to_owned()))
	}

	pub(crate) fn writer(&self, class_name: &str) -> Result<CustomWrite> {
		self.strategies
			.get(class_name)
			.and_then(|s| s.write)
			.ok_or_else(|| Error::UnsupportedCustomClass(class_name.to_owned()))
	}
}

/// Payload written by `java.util.HashMap#writeObject` (and reused verbatim
/// by `java.util.LinkedHashMap`). `load_factor`, `threshold` and `buckets`
/// record the values observed on the wire; emission re-derives them from
/// the entry count.
#[derive(Debug, Clone, Default)]
pub struct MapPayload {
	pub load_factor: f32,
	pub threshold: u32,
	pub buckets: u32,
	pub entries: Vec<(Value, Value)>,
}

impl MapPayload {
	pub fn with_entries(entries: Vec<(Value, Value)>) -> Self {
		let threshold = entries.len() as u32 * 2;
		Self {
			load_factor: 0.75,
			threshold,
			buckets: threshold.next_power_of_two(),
			entries,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct ListPayload {
	pub elements: Vec<Value>,
}

/// loadFactor bits, threshold, `TC_BLOCKDATA` `0x08`, bucket count, entry
/// count, the key/value sequence, `TC_ENDBLOCKDATA`.
#[tracing::instrument(skip_all)]
fn read_map_payload(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
	let load_factor = f32::from_bits(u32::read(stream)?);
	let threshold = u32::read(stream)?;
	Tag::expect(stream, Tag::BlockData)?;
	expect_block_length(stream, 0x08)?;
	let buckets = u32::read(stream)?;
	let count = u32::read(stream)? as usize;
	tracing::debug!(buckets, count, "reading map entries");

	let mut entries = Vec::with_capacity(count.min(1 << 16));
	for _ in 0..count {
		let key = string::read_next_element(stream, session)?;
		let value = string::read_next_element(stream, session)?;
		entries.push((key, value));
	}
	Tag::expect(stream, Tag::EndBlockData)?;

	Ok(Value::Map(MapPayload { load_factor, threshold, buckets, entries }))
}

fn write_map_payload(stream: &mut dyn Write, session: &mut Session, payload: &Value) -> Result<()> {
	let Value::Map(map) = payload else {
		return Err(Error::TypeMismatch { expected: "a map payload", found: payload.kind_name() });
	};
	let pairs = map.entries.len() as u32;
	let threshold = pairs * 2;

	0.75f32.to_bits().write(stream)?;
	threshold.write(stream)?;
	Tag::BlockData.write(stream)?;
	0x08u8.write(stream)?;
	// Bucket count must be a power of two no smaller than the entry count.
	threshold.next_power_of_two().write(stream)?;
	pairs.write(stream)?;
	for (key, value) in &map.entries {
		string::write_element(stream, session, key)?;
		string::write_element(stream, session, value)?;
	}
	Tag::EndBlockData.write(stream)
}

/// Size, `TC_BLOCKDATA` `0x04`, the size repeated, the elements,
/// `TC_ENDBLOCKDATA`. Read-only in this codec.
#[tracing::instrument(skip_all)]
fn read_array_list_payload(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
	let size = u32::read(stream)? as usize;
	Tag::expect(stream, Tag::BlockData)?;
	expect_block_length(stream, 0x04)?;
	let repeated = u32::read(stream)? as usize;
	if repeated != size {
		return Err(Error::UnexpectedTag {
			expected: "a repeated list size equal to the first",
			found: repeated as u32,
		});
	}
	read_list_elements(stream, session, size)
}

/// `TC_BLOCKDATA` `0x04`, size, the elements, `TC_ENDBLOCKDATA`.
/// Read-only in this codec.
#[tracing::instrument(skip_all)]
fn read_linked_list_payload(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
	Tag::expect(stream, Tag::BlockData)?;
	expect_block_length(stream, 0x04)?;
	let size = u32::read(stream)? as usize;
	read_list_elements(stream, session, size)
}

fn read_list_elements(stream: &mut dyn Read, session: &mut Session, size: usize) -> Result<Value> {
	let mut elements = Vec::with_capacity(size.min(1 << 16));
	for _ in 0..size {
		elements.push(string::read_next_element(stream, session)?);
	}
	Tag::expect(stream, Tag::EndBlockData)?;
	Ok(Value::List(ListPayload { elements }))
}

fn expect_block_length(stream: &mut dyn Read, expected: u8) -> Result<()> {
	let found = u8::read(stream)?;
	match found == expected {
		true => Ok(()),
		false => Err(Error::UnexpectedTag {
			expected: "the strategy's block-data length",
			found: found as u32,
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_classes_have_no_strategy() {
		let registry = CustomRegistry::with_builtins();
		assert!(matches!(
			registry.reader("java.util.TreeMap"),
			Err(Error::UnsupportedCustomClass(name)) if name == "java.util.TreeMap"
		));
	}

	#[test]
	fn list_strategies_are_read_only() {
		let registry = CustomRegistry::with_builtins();
		assert!(registry.reader(ARRAY_LIST_CLASS).is_ok());
		assert!(matches!(
			registry.writer(ARRAY_LIST_CLASS),
			Err(Error::UnsupportedCustomClass(_))
		));
	}

	#[test]
	fn derived_bucket_counts_are_powers_of_two() {
		let payload = MapPayload::with_entries(vec![
			(Value::String("a".into()), Value::String("b".into())),
			(Value::String("c".into()), Value::String("d".into())),
			(Value::String("e".into()), Value::String("f".into())),
		]);
		assert_eq!(payload.threshold, 6);
		assert_eq!(payload.buckets, 8);
	}
}
