use std::io::{Read, Write};

use crate::errors::{Error, Result};
use crate::handle::{Handle, HandleTable, RefEntry};
use crate::raw::array::ArrayNode;
use crate::raw::object::ObjectNode;
use crate::raw::{Session, Tag, Value};
use crate::utilities::{read_utf, write_utf, FromByteStream, ToByteStream};

/// Reads a string whose leading tag has not been consumed. `None` is a
/// `TC_NULL` string.
pub fn read_string(stream: &mut dyn Read, table: &mut HandleTable) -> Result<Option<String>> {
	match Tag::read(stream)? {
		Tag::String => Ok(Some(read_string_body(stream, table)?)),
		Tag::Reference => {
			let handle = Handle::read(stream)?;
			Ok(Some(table.resolve_string(handle)?.to_owned()))
		},
		Tag::Null => Ok(None),
		tag if tag.is_unsupported() => Err(Error::UnsupportedTag(tag as u8)),
		tag => Err(Error::UnexpectedTag {
			expected: "TC_STRING, TC_REFERENCE or TC_NULL",
			found: tag as u8 as u32,
		}),
	}
}

/// Reads the body of a fresh `TC_STRING` record and registers its handle.
pub fn read_string_body(stream: &mut dyn Read, table: &mut HandleTable) -> Result<String> {
	let length = u16::read(stream)? as usize;
	let value = read_utf(stream, length)?;
	table.register(RefEntry::String(value.clone()));
	Ok(value)
}

/// Emits a string, de-duplicating by payload: an equal registered string
/// becomes a `TC_REFERENCE`.
pub fn write_string(stream: &mut dyn Write, table: &mut HandleTable, value: &str) -> Result<()> {
	if let Some(handle) = table.find_string(value) {
		Tag::Reference.write(stream)?;
		return handle.write(stream);
	}
	Tag::String.write(stream)?;
	write_utf(stream, value)?;
	table.register(RefEntry::String(value.to_owned()));
	Ok(())
}

/// Reads one dynamically typed element (a map entry or list element),
/// dispatching on the leading tag.
pub fn read_next_element(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
	match Tag::read(stream)? {
		Tag::String => Ok(Value::String(read_string_body(stream, &mut session.table)?)),
		Tag::Object => ObjectNode::read_body(stream, session),
		Tag::Array => ArrayNode::read_body(stream, session),
		Tag::Null => Ok(Value::Null),
		Tag::Reference => {
			let handle = Handle::read(stream)?;
			match session.table.resolve(handle)? {
				RefEntry::String(value) => Ok(Value::String(value.clone())),
				RefEntry::Object(node) => Ok(Value::Object(node.clone())),
				RefEntry::Array(node) => Ok(Value::Array(node.clone())),
				RefEntry::ClassDesc(_) => Err(Error::BadHandle {
					handle: handle.wire_value(),
					expected: "a string, object or array",
				}),
			}
		},
		tag if tag.is_unsupported() => Err(Error::UnsupportedTag(tag as u8)),
		tag => Err(Error::UnexpectedTag {
			expected: "a tagged element",
			found: tag as u8 as u32,
		}),
	}
}

/// Emit counterpart of [read_next_element].
pub fn write_element(stream: &mut dyn Write, session: &mut Session, value: &Value) -> Result<()> {
	match value {
		Value::String(s) => write_string(stream, &mut session.table, s),
		Value::Object(node) => ObjectNode::write(stream, session, node),
		Value::Array(node) => ArrayNode::write(stream, session, node),
		Value::Null => Tag::Null.write(stream),
		other => Err(Error::TypeMismatch {
			expected: "a string, object, array or null element",
			found: other.kind_name(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;

	#[test]
	fn fresh_strings_register_a_handle() {
		let mut table = HandleTable::new();
		let bytes = [0x74, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o'];
		let value = read_string(&mut Cursor::new(&bytes[..]), &mut table).unwrap();
		assert_eq!(value.as_deref(), Some("hello"));
		assert_eq!(table.find_string("hello").unwrap().position(), 0);
	}

	#[test]
	fn references_resolve_to_the_registered_payload() {
		let mut table = HandleTable::new();
		table.register(RefEntry::String("x".into()));
		let bytes = [0x71, 0x00, 0x7E, 0x00, 0x00];
		let value = read_string(&mut Cursor::new(&bytes[..]), &mut table).unwrap();
		assert_eq!(value.as_deref(), Some("x"));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn repeated_strings_emit_one_record() {
		let mut table = HandleTable::new();
		let mut out = Vec::new();
		write_string(&mut out, &mut table, "x").unwrap();
		write_string(&mut out, &mut table, "x").unwrap();
		assert_eq!(out, [0x74, 0x00, 0x01, b'x', 0x71, 0x00, 0x7E, 0x00, 0x00]);
	}

	#[test]
	fn null_strings_decode_to_none() {
		let mut table = HandleTable::new();
		let value = read_string(&mut Cursor::new(&[0x70][..]), &mut table).unwrap();
		assert!(value.is_none());
	}
}
